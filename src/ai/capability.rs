//! Capability + session traits: the uniform contract every host AI
//! function is adapted to, whichever execution context serves it.

use super::error::BridgeError;
use super::types::{CapabilityKind, CapabilityStatus, SessionInput, SessionOptions};
use async_trait::async_trait;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

/// Chunks of a streamed reply, in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, BridgeError>> + Send>>;

/// A live model session. Owned by exactly one logical operation.
#[async_trait]
pub trait AiSession: Send {
    async fn invoke(&mut self, input: SessionInput) -> Result<String, BridgeError>;

    /// Stream the reply. Hosts without streaming yield the whole reply as one chunk.
    async fn invoke_streaming(&mut self, input: SessionInput) -> Result<ChunkStream, BridgeError> {
        let text = self.invoke(input).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    /// Release host resources. Called once, by `SessionGuard`.
    fn destroy(&mut self);
}

/// One host capability object (`Summarizer`, `Translator`, ...).
#[async_trait]
pub trait Capability: Send + Sync {
    fn kind(&self) -> CapabilityKind;

    async fn availability(&self, params: &SessionOptions) -> Result<CapabilityStatus, BridgeError>;

    async fn create(&self, options: &SessionOptions) -> Result<Box<dyn AiSession>, BridgeError>;
}

/// Capabilities reachable from one execution context.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<CapabilityKind, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        self.register(capability);
        self
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities.insert(capability.kind(), capability);
    }

    pub fn get(&self, kind: CapabilityKind) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(&kind).cloned()
    }

    pub fn contains(&self, kind: CapabilityKind) -> bool {
        self.capabilities.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}
