//! Page-world RPC: correlation-id request/response pairs exchanged over the
//! page's cross-context message bus.
//!
//! Two halves:
//!   - `PageHost`       runs where the AI globals live; owns a session table
//!   - `HostRpcClient`  runs in the isolated world; matches replies by `reqId`
//!
//! Ops: `canCreate`, `create`, `prompt`, `destroy`. Anything else is answered
//! with an `unknown-op` error.

use super::capability::{AiSession, CapabilityRegistry};
use super::error::{BridgeError, ErrorCode};
use super::types::{CapabilityKind, CapabilityStatus, SessionInput, SessionOptions, WireImage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Tag carried by every message on the bus; other traffic is ignored.
pub const MESSAGE_SOURCE: &str = "chrome-ai-overlay";
pub const REQUEST_TYPE: &str = "ai:req";
pub const RESPONSE_TYPE: &str = "ai:resp";

// ── Framing ─────────────────────────────────────────────────────────

/// Isolated world → page world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRequest {
    pub source: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub req_id: String,
    pub op: String,
    #[serde(default)]
    pub payload: Value,
}

impl HostRequest {
    pub fn new(op: impl Into<String>, payload: Value) -> Self {
        Self {
            source: MESSAGE_SOURCE.to_string(),
            message_type: REQUEST_TYPE.to_string(),
            req_id: uuid::Uuid::new_v4().to_string(),
            op: op.into(),
            payload,
        }
    }
}

/// Error body of a failed reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostFailure {
    pub message: String,
    pub code: String,
}

/// Page world → isolated world. Always echoes the request's `reqId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostResponse {
    pub source: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub ok: bool,
    pub req_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HostFailure>,
}

impl HostResponse {
    pub fn ok(req_id: &str, data: Value) -> Self {
        Self {
            source: MESSAGE_SOURCE.to_string(),
            message_type: RESPONSE_TYPE.to_string(),
            ok: true,
            req_id: req_id.to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(req_id: &str, message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            source: MESSAGE_SOURCE.to_string(),
            message_type: RESPONSE_TYPE.to_string(),
            ok: false,
            req_id: req_id.to_string(),
            data: None,
            error: Some(HostFailure {
                message: message.into(),
                code: code.as_str().to_string(),
            }),
        }
    }

    /// Unwrap into the reply data, mapping host error codes onto `ErrorCode`.
    pub fn into_result(self) -> Result<Value, BridgeError> {
        if self.ok {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        let failure = self.error.unwrap_or(HostFailure {
            message: "Host error".to_string(),
            code: ErrorCode::HostError.as_str().to_string(),
        });
        Err(BridgeError::Host {
            code: ErrorCode::from_code(&failure.code).unwrap_or(ErrorCode::HostError),
            message: failure.message,
        })
    }
}

// ── Page host (main world) ──────────────────────────────────────────

type SharedSession = Arc<tokio::sync::Mutex<Box<dyn AiSession>>>;
type OpResult = Result<Value, (ErrorCode, String)>;

/// Serves RPC requests against the capabilities of the main world.
pub struct PageHost {
    registry: CapabilityRegistry,
    sessions: Mutex<HashMap<String, SharedSession>>,
    next_id: AtomicU64,
}

impl PageHost {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of sessions created and not yet destroyed.
    pub fn session_count(&self) -> usize {
        self.sessions_lock().len()
    }

    /// Handle one bus message. Returns `None` for traffic not addressed to us.
    pub async fn handle(&self, message: &Value) -> Option<HostResponse> {
        let request: HostRequest = serde_json::from_value(message.clone()).ok()?;
        if request.source != MESSAGE_SOURCE || request.message_type != REQUEST_TYPE {
            return None;
        }
        log::debug!("[HOST] {} (reqId={})", request.op, request.req_id);

        let outcome = match request.op.as_str() {
            "canCreate" => self.can_create(&request.payload).await,
            "create" => self.create(&request.payload).await,
            "prompt" => self.prompt(&request.payload).await,
            "destroy" => self.destroy(&request.payload).await,
            other => {
                log::warn!("[HOST] Unknown op '{}'", other);
                Err((ErrorCode::UnknownOp, "Unknown op".to_string()))
            }
        };

        Some(match outcome {
            Ok(data) => HostResponse::ok(&request.req_id, data),
            Err((code, message)) => HostResponse::err(&request.req_id, message, code),
        })
    }

    async fn can_create(&self, payload: &Value) -> OpResult {
        let kind = capability_of(payload);
        let params = SessionOptions::from_value(payload.get("params").unwrap_or(&Value::Null));
        let status = match self.registry.get(kind) {
            Some(capability) => capability
                .availability(&params)
                .await
                .map_err(|e| (ErrorCode::HostError, e.to_string()))?,
            None => CapabilityStatus::Unavailable,
        };
        Ok(json!(status.as_str()))
    }

    async fn create(&self, payload: &Value) -> OpResult {
        let kind = capability_of(payload);
        let capability = self
            .registry
            .get(kind)
            .ok_or((ErrorCode::AiUnavailable, "AI not available".to_string()))?;
        let options = SessionOptions::from_value(payload.get("options").unwrap_or(&Value::Null));
        let session = capability
            .create(&options)
            .await
            .map_err(|e| (ErrorCode::HostError, e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.sessions_lock()
            .insert(id.clone(), Arc::new(tokio::sync::Mutex::new(session)));
        log::info!("[HOST] Created {} session {}", kind, id);
        Ok(json!({ "id": id }))
    }

    async fn prompt(&self, payload: &Value) -> OpResult {
        let id = session_id_of(payload);
        let session = self
            .sessions_lock()
            .get(&id)
            .cloned()
            .ok_or((ErrorCode::InvalidSession, "Invalid session".to_string()))?;

        let mut input = SessionInput::text(
            payload.get("prompt").and_then(Value::as_str).unwrap_or_default(),
        )
        .with_options(SessionOptions::from_value(payload.get("options").unwrap_or(&Value::Null)));
        if let Some(raw) = payload.get("image") {
            let wire: WireImage = serde_json::from_value(raw.clone())
                .map_err(|e| (ErrorCode::HostError, format!("Bad image payload: {}", e)))?;
            let image = wire
                .decode()
                .map_err(|e| (ErrorCode::HostError, format!("Bad image data: {}", e)))?;
            input = input.with_image(image);
        }

        let text = session
            .lock()
            .await
            .invoke(input)
            .await
            .map_err(|e| (ErrorCode::HostError, e.to_string()))?;
        Ok(json!({ "text": text }))
    }

    async fn destroy(&self, payload: &Value) -> OpResult {
        let id = session_id_of(payload);
        let removed = self.sessions_lock().remove(&id);
        if let Some(session) = removed {
            session.lock().await.destroy();
            log::info!("[HOST] Destroyed session {}", id);
        }
        Ok(json!({ "ok": true }))
    }

    fn sessions_lock(&self) -> MutexGuard<'_, HashMap<String, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn capability_of(payload: &Value) -> CapabilityKind {
    payload
        .get("capability")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or(CapabilityKind::LanguageModel)
}

/// Session ids travel as strings but older callers send numbers.
fn session_id_of(payload: &Value) -> String {
    match payload.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

// ── Client (isolated world) ─────────────────────────────────────────

/// Sends requests onto the bus and resolves them when the matching reply arrives.
pub struct HostRpcClient {
    outbound: mpsc::UnboundedSender<Value>,
    pending: Mutex<HashMap<String, oneshot::Sender<HostResponse>>>,
    timeout: Duration,
    session_timeout: Option<Duration>,
}

/// Removes a waiter from `pending` however its call ends, including when
/// the call future is dropped mid-flight.
struct PendingSlot<'a> {
    client: &'a HostRpcClient,
    req_id: String,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.client.pending_lock().remove(&self.req_id);
    }
}

impl HostRpcClient {
    /// `timeout` bounds [`HostRpcClient::call`]; session traffic uses no
    /// deadline until [`HostRpcClient::with_session_timeout`] sets one.
    pub fn new(outbound: mpsc::UnboundedSender<Value>, timeout: Duration) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            timeout,
            session_timeout: None,
        }
    }

    pub fn with_session_timeout(mut self, session_timeout: Option<Duration>) -> Self {
        self.session_timeout = session_timeout;
        self
    }

    /// Send a request and wait for the reply carrying the same `reqId`,
    /// at most the client timeout.
    pub async fn call(&self, op: &str, payload: Value) -> Result<Value, BridgeError> {
        self.call_within(op, payload, Some(self.timeout)).await
    }

    /// Like [`HostRpcClient::call`] with an explicit deadline; `None` waits
    /// until the host answers or the caller drops the future.
    pub async fn call_within(
        &self,
        op: &str,
        payload: Value,
        deadline: Option<Duration>,
    ) -> Result<Value, BridgeError> {
        let request = HostRequest::new(op, payload);
        let req_id = request.req_id.clone();
        let message = serde_json::to_value(&request)
            .map_err(|e| BridgeError::Transport(format!("JSON serialize failed: {}", e)))?;

        let (tx, rx) = oneshot::channel();
        self.pending_lock().insert(req_id.clone(), tx);
        let _slot = PendingSlot {
            client: self,
            req_id: req_id.clone(),
        };

        if self.outbound.send(message).is_err() {
            return Err(BridgeError::Transport("page host channel closed".to_string()));
        }

        let reply = match deadline {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    log::warn!(
                        "[RELAY] '{}' timed out after {}ms (reqId={})",
                        op,
                        limit.as_millis(),
                        req_id
                    );
                    return Err(BridgeError::Timeout(limit.as_millis() as u64));
                }
            },
            None => rx.await,
        };
        match reply {
            Ok(response) => response.into_result(),
            Err(_) => Err(BridgeError::Transport(format!("'{}' reply dropped", op))),
        }
    }

    /// Fire-and-forget request; the reply, if any, is discarded.
    pub fn notify(&self, op: &str, payload: Value) {
        let request = HostRequest::new(op, payload);
        match serde_json::to_value(&request) {
            Ok(message) => {
                if self.outbound.send(message).is_err() {
                    log::warn!("[RELAY] '{}' dropped, page host channel closed", op);
                }
            }
            Err(e) => log::error!("[RELAY] '{}' could not be serialized: {}", op, e),
        }
    }

    /// Route an incoming bus message to its waiting caller.
    /// Returns false for messages that are not replies we are waiting on.
    pub fn deliver(&self, message: &Value) -> bool {
        let Ok(response) = serde_json::from_value::<HostResponse>(message.clone()) else {
            return false;
        };
        if response.source != MESSAGE_SOURCE || response.message_type != RESPONSE_TYPE {
            return false;
        }
        match self.pending_lock().remove(&response.req_id) {
            Some(waiter) => waiter.send(response).is_ok(),
            None => {
                log::debug!("[RELAY] No caller waiting on reqId={}", response.req_id);
                false
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending_lock().len()
    }

    /// Open a session on the page host and wrap it as an `AiSession`.
    pub async fn create_session(
        self: &Arc<Self>,
        kind: CapabilityKind,
        options: &SessionOptions,
    ) -> Result<HostSession, BridgeError> {
        let data = self
            .call_within(
                "create",
                json!({ "capability": kind, "options": options }),
                self.session_timeout,
            )
            .await?;
        let id = match data.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(BridgeError::Transport("create reply had no session id".to_string())),
        };
        Ok(HostSession {
            id,
            client: Arc::clone(self),
            destroyed: false,
        })
    }

    fn pending_lock(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<HostResponse>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A session living in the page world, driven over RPC.
pub struct HostSession {
    id: String,
    client: Arc<HostRpcClient>,
    destroyed: bool,
}

impl HostSession {
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl AiSession for HostSession {
    async fn invoke(&mut self, input: SessionInput) -> Result<String, BridgeError> {
        let mut payload = json!({ "id": self.id, "prompt": input.text });
        if !input.options.is_empty() {
            payload["options"] = input.options.to_value();
        }
        if let Some(image) = &input.image {
            payload["image"] = serde_json::to_value(image.to_wire())
                .map_err(|e| BridgeError::Transport(format!("JSON serialize failed: {}", e)))?;
        }
        let data = self
            .client
            .call_within("prompt", payload, self.client.session_timeout)
            .await?;
        Ok(data
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.client.notify("destroy", json!({ "id": self.id }));
    }
}

/// Wire a client to a page host over an in-memory bus standing in for
/// `window.postMessage`. Must be called from inside a tokio runtime.
pub fn connect(
    host: Arc<PageHost>,
    timeout: Duration,
    session_timeout: Option<Duration>,
) -> Arc<HostRpcClient> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let client = Arc::new(HostRpcClient::new(tx, timeout).with_session_timeout(session_timeout));
    let weak = Arc::downgrade(&client);

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let host = Arc::clone(&host);
            let weak = weak.clone();
            tokio::spawn(async move {
                let Some(response) = host.handle(&message).await else {
                    return;
                };
                let Ok(value) = serde_json::to_value(&response) else {
                    return;
                };
                if let Some(client) = weak.upgrade() {
                    client.deliver(&value);
                }
            });
        }
        log::debug!("[HOST] Message bus closed");
    });

    client
}
