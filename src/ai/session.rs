//! Scoped session ownership.
//!
//! A `SessionGuard` is the only way services hold a session: dropping it
//! destroys the session, so success, `?`-propagated errors and early
//! returns all release the host model exactly once.

use super::capability::{AiSession, ChunkStream};
use super::error::BridgeError;
use super::types::{CapabilityKind, SessionInput};

pub struct SessionGuard {
    kind: CapabilityKind,
    session: Box<dyn AiSession>,
}

impl SessionGuard {
    pub fn new(kind: CapabilityKind, session: Box<dyn AiSession>) -> Self {
        log::debug!("[SESSION] {} session opened", kind);
        Self { kind, session }
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub async fn invoke(&mut self, input: SessionInput) -> Result<String, BridgeError> {
        self.session.invoke(input).await
    }

    pub async fn invoke_streaming(&mut self, input: SessionInput) -> Result<ChunkStream, BridgeError> {
        self.session.invoke_streaming(input).await
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.destroy();
        log::debug!("[SESSION] {} session destroyed", self.kind);
    }
}
