//! Capability bridge: one entry point for every capability probe and
//! session, picking the in-context transport when the capability is
//! reachable and the relay otherwise.

use super::error::BridgeError;
use super::session::SessionGuard;
use super::transport::CapabilityTransport;
use super::types::{CapabilityKind, CapabilityStatus, SessionOptions};
use std::sync::Arc;

#[derive(Clone)]
pub struct CapabilityBridge {
    direct: Arc<dyn CapabilityTransport>,
    relay: Option<Arc<dyn CapabilityTransport>>,
}

impl CapabilityBridge {
    pub fn new(direct: Arc<dyn CapabilityTransport>) -> Self {
        Self { direct, relay: None }
    }

    pub fn with_relay(mut self, relay: Arc<dyn CapabilityTransport>) -> Self {
        self.relay = Some(relay);
        self
    }

    fn route(&self, kind: CapabilityKind) -> Option<&Arc<dyn CapabilityTransport>> {
        if self.direct.is_reachable(kind) {
            return Some(&self.direct);
        }
        self.relay.as_ref().filter(|relay| relay.is_reachable(kind))
    }

    /// Probe a capability. Never fails: an unreachable capability, a relay
    /// timeout or a transport error all read as `Unavailable`.
    pub async fn check_availability(
        &self,
        kind: CapabilityKind,
        params: &SessionOptions,
    ) -> CapabilityStatus {
        let Some(transport) = self.route(kind) else {
            log::info!("[BRIDGE] {} not reachable from any context", kind);
            return CapabilityStatus::Unavailable;
        };
        match transport.availability(kind, params).await {
            Ok(status) => {
                log::debug!("[BRIDGE] {} via {}: {}", kind, transport.name(), status);
                status
            }
            Err(e) => {
                log::warn!("[BRIDGE] {} availability via {} failed: {}", kind, transport.name(), e);
                CapabilityStatus::Unavailable
            }
        }
    }

    /// Create a fresh session. Options pass through verbatim; the session
    /// is never cached.
    pub async fn create_session(
        &self,
        kind: CapabilityKind,
        options: &SessionOptions,
    ) -> Result<SessionGuard, BridgeError> {
        let transport = self.route(kind).ok_or(BridgeError::Unreachable(kind))?;
        match transport.create(kind, options).await {
            Ok(session) => Ok(SessionGuard::new(kind, session)),
            Err(e) => {
                log::warn!("[BRIDGE] {} create via {} failed: {}", kind, transport.name(), e);
                Err(match e {
                    created @ BridgeError::Create { .. } => created,
                    other => BridgeError::Create {
                        kind,
                        message: other.to_string(),
                    },
                })
            }
        }
    }
}
