//! Transport seam between the bridge and a context that can reach the host AI.
//!
//! `DirectTransport` calls capability objects living in this context.
//! `RelayTransport` (relay.rs) forwards to the privileged main world.

use super::capability::{AiSession, CapabilityRegistry};
use super::error::BridgeError;
use super::types::{CapabilityKind, CapabilityStatus, SessionOptions};
use async_trait::async_trait;

#[async_trait]
pub trait CapabilityTransport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn is_reachable(&self, kind: CapabilityKind) -> bool;

    async fn availability(
        &self,
        kind: CapabilityKind,
        params: &SessionOptions,
    ) -> Result<CapabilityStatus, BridgeError>;

    async fn create(
        &self,
        kind: CapabilityKind,
        options: &SessionOptions,
    ) -> Result<Box<dyn AiSession>, BridgeError>;
}

/// In-process calls against capabilities registered for this context.
pub struct DirectTransport {
    registry: CapabilityRegistry,
}

impl DirectTransport {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl CapabilityTransport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn is_reachable(&self, kind: CapabilityKind) -> bool {
        self.registry.contains(kind)
    }

    async fn availability(
        &self,
        kind: CapabilityKind,
        params: &SessionOptions,
    ) -> Result<CapabilityStatus, BridgeError> {
        let capability = self.registry.get(kind).ok_or(BridgeError::Unreachable(kind))?;
        capability.availability(params).await
    }

    async fn create(
        &self,
        kind: CapabilityKind,
        options: &SessionOptions,
    ) -> Result<Box<dyn AiSession>, BridgeError> {
        let capability = self.registry.get(kind).ok_or(BridgeError::Unreachable(kind))?;
        capability.create(options).await
    }
}
