//! Privileged relay: reaching the AI globals from the isolated world.
//!
//! The isolated content context cannot see `Summarizer`, `Translator`, ...
//! so it asks a broker (the extension service worker) to run a probe in the
//! page's main world and send the status back:
//!
//!   content ──RelayRequest──▶ ServiceWorker ──probe──▶ MainWorld
//!   content ◀──{result}────── ServiceWorker ◀──status── MainWorld
//!
//! Session creation goes through the page-world RPC (host.rs), after asking
//! the broker once to inject the page host.

use super::capability::{AiSession, CapabilityRegistry};
use super::error::BridgeError;
use super::host::HostRpcClient;
use super::transport::CapabilityTransport;
use super::types::{CapabilityKind, CapabilityStatus, SessionOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tab the content script runs in, as reported by the runtime.
pub type TabId = u32;

// ── Protocol ────────────────────────────────────────────────────────

/// Message sent from the isolated world to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayRequest {
    #[serde(rename = "check-ai-availability")]
    CheckSummarizer,
    #[serde(rename = "check-translator-availability", rename_all = "camelCase")]
    CheckTranslator {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_language: Option<String>,
    },
    #[serde(rename = "check-rewriter-availability")]
    CheckRewriter {
        #[serde(default)]
        options: SessionOptions,
    },
    #[serde(rename = "check-language-model-availability")]
    CheckLanguageModel,
    #[serde(rename = "check-language-detector-availability")]
    CheckLanguageDetector,
    #[serde(rename = "inject-ai-host")]
    InjectHost,
}

impl RelayRequest {
    /// Availability probe for a capability with its probe parameters.
    pub fn probe(kind: CapabilityKind, params: &SessionOptions) -> Self {
        match kind {
            CapabilityKind::Summarizer => Self::CheckSummarizer,
            CapabilityKind::Translator => Self::CheckTranslator {
                source_language: params.get_str("sourceLanguage").map(str::to_string),
                target_language: params.get_str("targetLanguage").map(str::to_string),
            },
            CapabilityKind::Rewriter => Self::CheckRewriter {
                options: params.clone(),
            },
            CapabilityKind::LanguageModel => Self::CheckLanguageModel,
            CapabilityKind::LanguageDetector => Self::CheckLanguageDetector,
        }
    }

    /// Reverse of [`RelayRequest::probe`]. `None` for non-probe messages.
    pub fn probe_target(&self) -> Option<(CapabilityKind, SessionOptions)> {
        Some(match self {
            Self::CheckSummarizer => (CapabilityKind::Summarizer, SessionOptions::new()),
            Self::CheckTranslator {
                source_language,
                target_language,
            } => (
                CapabilityKind::Translator,
                SessionOptions::new()
                    .with("sourceLanguage", source_language.as_deref().unwrap_or("en"))
                    .with("targetLanguage", target_language.as_deref().unwrap_or("en")),
            ),
            Self::CheckRewriter { options } => (CapabilityKind::Rewriter, options.clone()),
            Self::CheckLanguageModel => (CapabilityKind::LanguageModel, SessionOptions::new()),
            Self::CheckLanguageDetector => (CapabilityKind::LanguageDetector, SessionOptions::new()),
            Self::InjectHost => return None,
        })
    }
}

/// Broker reply to an availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub result: CapabilityStatus,
}

/// Broker reply to `inject-ai-host`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Broker side ─────────────────────────────────────────────────────

/// Anything that accepts a runtime message and answers it (the
/// `chrome.runtime.sendMessage` round trip).
#[async_trait]
pub trait Broker: Send + Sync {
    async fn send(&self, message: Value) -> Result<Value, BridgeError>;
}

/// Runs code inside a tab's main world.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn probe(
        &self,
        tab: TabId,
        kind: CapabilityKind,
        params: &SessionOptions,
    ) -> Result<CapabilityStatus, String>;

    async fn inject_host(&self, tab: TabId) -> Result<(), String>;
}

/// Main-world executor backed by the capabilities visible there.
pub struct MainWorld {
    registry: CapabilityRegistry,
    host_injected: AtomicBool,
}

impl MainWorld {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry,
            host_injected: AtomicBool::new(false),
        }
    }

    pub fn host_injected(&self) -> bool {
        self.host_injected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptExecutor for MainWorld {
    async fn probe(
        &self,
        tab: TabId,
        kind: CapabilityKind,
        params: &SessionOptions,
    ) -> Result<CapabilityStatus, String> {
        let Some(capability) = self.registry.get(kind) else {
            log::info!("[RELAY] tab {}: window.{} not present", tab, kind);
            return Ok(CapabilityStatus::Unavailable);
        };
        capability.availability(params).await.map_err(|e| e.to_string())
    }

    async fn inject_host(&self, tab: TabId) -> Result<(), String> {
        self.host_injected.store(true, Ordering::SeqCst);
        log::info!("[RELAY] AI host injected into tab {}", tab);
        Ok(())
    }
}

/// The extension's background broker. A probe with no sender tab, an
/// executor error or a missing global answers `unavailable`.
pub struct ServiceWorker {
    sender_tab: Option<TabId>,
    executor: Arc<dyn ScriptExecutor>,
}

impl ServiceWorker {
    pub fn new(sender_tab: Option<TabId>, executor: Arc<dyn ScriptExecutor>) -> Self {
        Self {
            sender_tab,
            executor,
        }
    }

    async fn answer_probe(&self, kind: CapabilityKind, params: &SessionOptions) -> ProbeResponse {
        let Some(tab) = self.sender_tab else {
            log::warn!("[RELAY] {} check failed: no sender tab id", kind);
            return ProbeResponse {
                result: CapabilityStatus::Unavailable,
            };
        };
        let result = match self.executor.probe(tab, kind, params).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!("[RELAY] {} check failed in tab {}: {}", kind, tab, e);
                CapabilityStatus::Unavailable
            }
        };
        log::info!("[RELAY] {} availability in tab {}: {}", kind, tab, result);
        ProbeResponse { result }
    }

    async fn answer_inject(&self) -> InjectResponse {
        let outcome = match self.sender_tab {
            Some(tab) => self.executor.inject_host(tab).await,
            None => Err("No sender tab id".to_string()),
        };
        match outcome {
            Ok(()) => InjectResponse { ok: true, error: None },
            Err(e) => {
                log::warn!("[RELAY] AI host injection failed: {}", e);
                InjectResponse {
                    ok: false,
                    error: Some(e),
                }
            }
        }
    }
}

#[async_trait]
impl Broker for ServiceWorker {
    async fn send(&self, message: Value) -> Result<Value, BridgeError> {
        let request: RelayRequest = serde_json::from_value(message)
            .map_err(|e| BridgeError::Transport(format!("unrecognized runtime message: {}", e)))?;

        let reply = match request.probe_target() {
            Some((kind, params)) => serde_json::to_value(self.answer_probe(kind, &params).await),
            None => serde_json::to_value(self.answer_inject().await),
        };
        reply.map_err(|e| BridgeError::Transport(format!("JSON serialize failed: {}", e)))
    }
}

// ── Transport ───────────────────────────────────────────────────────

/// Capability transport for the isolated world.
pub struct RelayTransport {
    broker: Arc<dyn Broker>,
    host: Arc<HostRpcClient>,
    timeout: Duration,
    host_ready: tokio::sync::OnceCell<()>,
}

impl RelayTransport {
    pub fn new(broker: Arc<dyn Broker>, host: Arc<HostRpcClient>, timeout: Duration) -> Self {
        Self {
            broker,
            host,
            timeout,
            host_ready: tokio::sync::OnceCell::new(),
        }
    }

    async fn round_trip(&self, request: &RelayRequest) -> Result<Value, BridgeError> {
        let message = serde_json::to_value(request)
            .map_err(|e| BridgeError::Transport(format!("JSON serialize failed: {}", e)))?;
        tokio::time::timeout(self.timeout, self.broker.send(message))
            .await
            .map_err(|_| BridgeError::Timeout(self.timeout.as_millis() as u64))?
    }

    /// Ask the broker to inject the page host; only the first success sticks.
    async fn ensure_host(&self) -> Result<(), BridgeError> {
        self.host_ready
            .get_or_try_init(|| async {
                let reply = self.round_trip(&RelayRequest::InjectHost).await?;
                let reply: InjectResponse = serde_json::from_value(reply)
                    .map_err(|e| BridgeError::Transport(format!("bad inject reply: {}", e)))?;
                if reply.ok {
                    Ok(())
                } else {
                    Err(BridgeError::Transport(
                        reply.error.unwrap_or_else(|| "AI host injection failed".to_string()),
                    ))
                }
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl CapabilityTransport for RelayTransport {
    fn name(&self) -> &'static str {
        "relay"
    }

    fn is_reachable(&self, _kind: CapabilityKind) -> bool {
        true
    }

    async fn availability(
        &self,
        kind: CapabilityKind,
        params: &SessionOptions,
    ) -> Result<CapabilityStatus, BridgeError> {
        let reply = self.round_trip(&RelayRequest::probe(kind, params)).await?;
        let reply: ProbeResponse = serde_json::from_value(reply)
            .map_err(|e| BridgeError::Transport(format!("bad probe reply: {}", e)))?;
        Ok(reply.result)
    }

    async fn create(
        &self,
        kind: CapabilityKind,
        options: &SessionOptions,
    ) -> Result<Box<dyn AiSession>, BridgeError> {
        self.ensure_host().await?;
        let session = self.host.create_session(kind, options).await?;
        log::debug!("[RELAY] {} session {} opened in page world", kind, session.id());
        Ok(Box::new(session))
    }
}
