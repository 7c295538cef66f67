//! Shared fakes for the integration tests: a spy capability that counts
//! probes, creations and disposals, and a view that records every call.

#![allow(dead_code)]

use async_trait::async_trait;
use chrome_ai_overlay::ai::{
    AiSession, BridgeError, Capability, CapabilityBridge, CapabilityKind, CapabilityRegistry,
    CapabilityStatus, ChunkStream, DirectTransport, SessionInput, SessionOptions,
};
use chrome_ai_overlay::catalog::MenuItem;
use chrome_ai_overlay::overlay::{OverlayView, ViewKind};
use chrome_ai_overlay::services::chat::ChatTurn;
use chrome_ai_overlay::services::image::ImageMetadata;
use chrome_ai_overlay::services::prompt::{PromptTemplate, RecentPrompt};
use chrome_ai_overlay::services::rewrite::RewriteOptions;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Spy capability ───────────────────────────────────────────────────

/// What a spy session answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    /// Streamed chunks, then end of stream.
    Chunks(Vec<String>),
    /// Streamed chunks, then the stream never ends.
    ChunksThenHang(Vec<String>),
    /// Whole reply after a pause; streaming yields it as one chunk.
    Delayed(Duration, String),
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }

    pub fn chunks(parts: &[&str]) -> Self {
        Self::Chunks(parts.iter().map(|p| p.to_string()).collect())
    }

    pub fn chunks_then_hang(parts: &[&str]) -> Self {
        Self::ChunksThenHang(parts.iter().map(|p| p.to_string()).collect())
    }

    pub fn delayed(after: Duration, s: &str) -> Self {
        Self::Delayed(after, s.to_string())
    }
}

#[derive(Default)]
pub struct SpyCounters {
    pub probes: AtomicUsize,
    pub creates: AtomicUsize,
    pub destroys: AtomicUsize,
    pub invokes: AtomicUsize,
    pub inputs: Mutex<Vec<SessionInput>>,
    pub create_options: Mutex<Vec<SessionOptions>>,
}

pub struct SpyCapability {
    kind: CapabilityKind,
    status: CapabilityStatus,
    reply: Reply,
    fail_create: bool,
    pub counters: Arc<SpyCounters>,
}

impl SpyCapability {
    pub fn new(kind: CapabilityKind, status: CapabilityStatus, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            kind,
            status,
            reply,
            fail_create: false,
            counters: Arc::new(SpyCounters::default()),
        })
    }

    pub fn failing_create(kind: CapabilityKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            status: CapabilityStatus::Ready,
            reply: Reply::text("unused"),
            fail_create: true,
            counters: Arc::new(SpyCounters::default()),
        })
    }

    pub fn probes(&self) -> usize {
        self.counters.probes.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.counters.creates.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.counters.destroys.load(Ordering::SeqCst)
    }

    pub fn invokes(&self) -> usize {
        self.counters.invokes.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<SessionInput> {
        self.counters.inputs.lock().unwrap().last().cloned()
    }

    pub fn last_create_options(&self) -> Option<SessionOptions> {
        self.counters.create_options.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Capability for SpyCapability {
    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    async fn availability(&self, _params: &SessionOptions) -> Result<CapabilityStatus, BridgeError> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.status)
    }

    async fn create(&self, options: &SessionOptions) -> Result<Box<dyn AiSession>, BridgeError> {
        self.counters.create_options.lock().unwrap().push(options.clone());
        if self.fail_create {
            return Err(BridgeError::Invoke("model crashed during load".into()));
        }
        self.counters.creates.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SpySession {
            reply: self.reply.clone(),
            counters: Arc::clone(&self.counters),
            destroyed: false,
        }))
    }
}

struct SpySession {
    reply: Reply,
    counters: Arc<SpyCounters>,
    destroyed: bool,
}

#[async_trait]
impl AiSession for SpySession {
    async fn invoke(&mut self, input: SessionInput) -> Result<String, BridgeError> {
        self.counters.invokes.fetch_add(1, Ordering::SeqCst);
        self.counters.inputs.lock().unwrap().push(input);
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(message) => Err(BridgeError::Invoke(message.clone())),
            Reply::Chunks(parts) | Reply::ChunksThenHang(parts) => Ok(parts.concat()),
            Reply::Delayed(after, text) => {
                tokio::time::sleep(*after).await;
                Ok(text.clone())
            }
        }
    }

    async fn invoke_streaming(&mut self, input: SessionInput) -> Result<ChunkStream, BridgeError> {
        self.counters.invokes.fetch_add(1, Ordering::SeqCst);
        self.counters.inputs.lock().unwrap().push(input);
        let ok = |parts: &Vec<String>| stream::iter(parts.clone().into_iter().map(Ok::<_, BridgeError>));
        match &self.reply {
            Reply::Text(text) => Ok(Box::pin(stream::iter(vec![Ok::<_, BridgeError>(text.clone())]))),
            Reply::Fail(message) => Err(BridgeError::Invoke(message.clone())),
            Reply::Chunks(parts) => Ok(Box::pin(ok(parts))),
            Reply::ChunksThenHang(parts) => Ok(Box::pin(ok(parts).chain(stream::pending()))),
            Reply::Delayed(after, text) => {
                tokio::time::sleep(*after).await;
                Ok(Box::pin(stream::iter(vec![Ok::<_, BridgeError>(text.clone())])))
            }
        }
    }

    fn destroy(&mut self) {
        assert!(!self.destroyed, "session destroyed twice");
        self.destroyed = true;
        self.counters.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn registry_of(spies: &[Arc<SpyCapability>]) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    for spy in spies {
        registry.register(spy.clone());
    }
    registry
}

/// Bridge whose capabilities are all reachable in-context.
pub fn direct_bridge(spies: &[Arc<SpyCapability>]) -> CapabilityBridge {
    CapabilityBridge::new(Arc::new(DirectTransport::new(registry_of(spies))))
}

/// Progress sink that records phases in order.
#[derive(Default)]
pub struct PhaseLog(pub Mutex<Vec<chrome_ai_overlay::services::ProgressPhase>>);

impl chrome_ai_overlay::services::ProgressSink for PhaseLog {
    fn emit(&self, phase: chrome_ai_overlay::services::ProgressPhase) {
        self.0.lock().unwrap().push(phase);
    }
}

impl PhaseLog {
    pub fn phases(&self) -> Vec<chrome_ai_overlay::services::ProgressPhase> {
        self.0.lock().unwrap().clone()
    }
}

// ── Recording view ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Show,
    Hide,
    FabActive(bool),
    MenuItems(usize),
    ShowView(ViewKind),
    Loading(ViewKind, String),
    Result(ViewKind, String),
    Status(ViewKind, String),
    Languages(usize),
    Templates { catalog: usize, recent: usize },
    ImageSuggestions(usize),
    ImageMetadata(String),
    ChatMessage(ChatTurn),
    StreamBegin,
    Chunk(String),
    StreamEnd,
    TypingShown,
    TypingRemoved,
    Suggestions(Vec<String>),
    ChatCleared,
    SendEnabled(bool),
}

#[derive(Default)]
pub struct RecordingView {
    visible: AtomicBool,
    events: Mutex<Vec<ViewEvent>>,
    pub language: Mutex<Option<String>>,
    pub inputs: Mutex<HashMap<ViewKind, String>>,
    pub template: Mutex<Option<String>>,
    pub rewrite: Mutex<RewriteOptions>,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn set_input(&self, view: ViewKind, text: &str) {
        self.inputs.lock().unwrap().insert(view, text.to_string());
    }

    pub fn select_language(&self, label: &str) {
        *self.language.lock().unwrap() = Some(label.to_string());
    }

    pub fn select_template(&self, id: &str) {
        *self.template.lock().unwrap() = Some(id.to_string());
    }

    pub fn results(&self, view: ViewKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Result(v, text) if v == view => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn loading_labels(&self, view: ViewKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Loading(v, label) if v == view => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self, view: ViewKind) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::Status(v, text) if v == view => Some(text),
            _ => None,
        })
    }

    pub fn count(&self, wanted: &ViewEvent) -> usize {
        self.events().iter().filter(|e| *e == wanted).count()
    }

    pub fn position(&self, wanted: &ViewEvent) -> Option<usize> {
        self.events().iter().position(|e| e == wanted)
    }
}

impl OverlayView for RecordingView {
    fn show(&self) {
        self.visible.store(true, Ordering::SeqCst);
        self.record(ViewEvent::Show);
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
        self.record(ViewEvent::Hide);
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn set_fab_active(&self, active: bool) {
        self.record(ViewEvent::FabActive(active));
    }

    fn set_menu_items(&self, items: &[MenuItem]) {
        self.record(ViewEvent::MenuItems(items.len()));
    }

    fn show_view(&self, view: ViewKind) {
        self.record(ViewEvent::ShowView(view));
    }

    fn set_loading(&self, view: ViewKind, label: &str) {
        self.record(ViewEvent::Loading(view, label.to_string()));
    }

    fn set_result(&self, view: ViewKind, text: &str) {
        self.record(ViewEvent::Result(view, text.to_string()));
    }

    fn set_status(&self, view: ViewKind, message: &str) {
        self.record(ViewEvent::Status(view, message.to_string()));
    }

    fn set_languages(&self, languages: &[(&str, &str)]) {
        self.record(ViewEvent::Languages(languages.len()));
    }

    fn selected_language(&self) -> Option<String> {
        self.language.lock().unwrap().clone()
    }

    fn input_text(&self, view: ViewKind) -> String {
        self.inputs.lock().unwrap().get(&view).cloned().unwrap_or_default()
    }

    fn selected_template(&self) -> Option<String> {
        self.template.lock().unwrap().clone()
    }

    fn set_prompt_templates(&self, templates: &[PromptTemplate], recent: &[RecentPrompt]) {
        self.record(ViewEvent::Templates {
            catalog: templates.len(),
            recent: recent.len(),
        });
    }

    fn rewrite_options(&self) -> RewriteOptions {
        self.rewrite.lock().unwrap().clone()
    }

    fn set_image_suggestions(&self, suggestions: &[&str]) {
        self.record(ViewEvent::ImageSuggestions(suggestions.len()));
    }

    fn show_image_metadata(&self, metadata: &ImageMetadata) {
        self.record(ViewEvent::ImageMetadata(metadata.size.clone()));
    }

    fn append_chat_message(&self, turn: &ChatTurn) {
        self.record(ViewEvent::ChatMessage(turn.clone()));
    }

    fn begin_assistant_stream(&self) {
        self.record(ViewEvent::StreamBegin);
    }

    fn append_assistant_chunk(&self, chunk: &str) {
        self.record(ViewEvent::Chunk(chunk.to_string()));
    }

    fn finish_assistant_stream(&self) {
        self.record(ViewEvent::StreamEnd);
    }

    fn show_typing_indicator(&self) {
        self.record(ViewEvent::TypingShown);
    }

    fn remove_typing_indicator(&self) {
        self.record(ViewEvent::TypingRemoved);
    }

    fn show_chat_suggestions(&self, questions: &[String]) {
        self.record(ViewEvent::Suggestions(questions.to_vec()));
    }

    fn clear_chat(&self) {
        self.record(ViewEvent::ChatCleared);
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.record(ViewEvent::SendEnabled(enabled));
    }
}
