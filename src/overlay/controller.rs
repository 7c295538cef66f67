//! Overlay controller: the state machine between the view and the services.
//!
//! States: `Closed`, or `Open(view)` for the menu and each leaf view.
//!   - FAB click toggles between `Closed` and the last shown view (menu at first)
//!   - selecting an intent opens its view and starts its service call
//!   - back returns to the menu; outside click closes, keeping the last view
//!
//! Every transition bumps an epoch. Async results tagged with an older
//! epoch are dropped instead of written into a view the user left. Calls
//! are not cancelled, except a streaming chat reply, which is.

use super::history::ChatHistory;
use super::messages;
use super::view::{OverlayView, ViewKind};
use crate::ai::{CapabilityBridge, CodedError, ImageInput};
use crate::catalog::{MenuCatalog, MenuIntent};
use crate::config::OverlayConfig;
use crate::services::chat::ChatTurn;
use crate::services::image::{image_metadata, validate_image, SUGGESTIONS};
use crate::services::language::{language_name, LANGUAGES};
use crate::services::prompt::{default_templates, find_template, RecentPrompt, RecentPrompts};
use crate::services::{
    ChatService, ImageAnalysisService, NoProgress, ProgressPhase, PromptService, RewriteService,
    SummarizeService, TranslateService,
};
use crate::text::{page_text, PageTextSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Language the translation view probes with before the user picks one.
const DEFAULT_TARGET: &str = "es";
const NO_TEMPLATE: &str = "Select a prompt template.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Closed,
    Open(ViewKind),
}

/// One service per capability, all sharing a bridge.
#[derive(Clone)]
pub struct OverlayServices {
    pub summarize: SummarizeService,
    pub translate: TranslateService,
    pub rewrite: RewriteService,
    pub chat: ChatService,
    pub prompt: PromptService,
    pub image: ImageAnalysisService,
}

impl OverlayServices {
    pub fn new(bridge: CapabilityBridge) -> Self {
        Self {
            summarize: SummarizeService::new(bridge.clone()),
            translate: TranslateService::new(bridge.clone()),
            rewrite: RewriteService::new(bridge.clone()),
            chat: ChatService::new(bridge.clone()),
            prompt: PromptService::new(bridge.clone()),
            image: ImageAnalysisService::new(bridge),
        }
    }
}

struct ControllerState {
    initialized: bool,
    open: bool,
    last_view: ViewKind,
    epoch: u64,
    chat: ChatHistory,
    recent: RecentPrompts,
    /// In-flight chat reply: (sequence number, token).
    chat_stream: Option<(u64, CancellationToken)>,
    next_stream: u64,
}

struct Inner {
    view: Arc<dyn OverlayView>,
    page: Arc<dyn PageTextSource>,
    services: OverlayServices,
    catalog: MenuCatalog,
    config: OverlayConfig,
    state: Mutex<ControllerState>,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct OverlayController {
    inner: Arc<Inner>,
}

impl OverlayController {
    pub fn new(
        view: Arc<dyn OverlayView>,
        page: Arc<dyn PageTextSource>,
        services: OverlayServices,
        catalog: MenuCatalog,
        config: OverlayConfig,
    ) -> Self {
        let state = ControllerState {
            initialized: false,
            open: false,
            last_view: ViewKind::Menu,
            epoch: 0,
            chat: ChatHistory::new(config.chat_history_limit),
            recent: RecentPrompts::new(config.recent_prompt_limit),
            chat_stream: None,
            next_stream: 0,
        };
        Self {
            inner: Arc::new(Inner {
                view,
                page,
                services,
                catalog,
                config,
                state: Mutex::new(state),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn view(&self) -> &dyn OverlayView {
        self.inner.view.as_ref()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Render the menu and reset to `Closed`. Repeated calls are no-ops.
    pub fn initialize(&self) {
        {
            let mut state = self.lock();
            if state.initialized {
                return;
            }
            state.initialized = true;
        }
        self.view().set_menu_items(&self.inner.catalog.load_items());
        self.view().hide();
        self.view().set_fab_active(false);
        log::info!("[OVERLAY] Initialized");
    }

    /// Tear down: stop any chat stream, hide everything, drop pending results.
    pub fn destroy(&self) {
        let stream = {
            let mut state = self.lock();
            if !state.initialized {
                return;
            }
            state.initialized = false;
            state.open = false;
            state.epoch += 1;
            state.chat.clear();
            state.chat_stream.take()
        };
        if let Some((_, token)) = stream {
            token.cancel();
        }
        self.view().hide();
        self.view().set_fab_active(false);
        log::info!("[OVERLAY] Destroyed");
    }

    pub fn state(&self) -> OverlayState {
        let state = self.lock();
        if state.open {
            OverlayState::Open(state.last_view)
        } else {
            OverlayState::Closed
        }
    }

    pub fn chat_history(&self) -> Vec<ChatTurn> {
        self.lock().chat.turns()
    }

    pub fn recent_prompts(&self) -> Vec<RecentPrompt> {
        self.lock().recent.entries()
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    fn current_epoch(&self) -> u64 {
        self.lock().epoch
    }

    // ── Transitions ─────────────────────────────────────────────────

    pub fn handle_fab_click(&self) {
        self.view().toggle();
        let visible = self.view().is_visible();
        let last_view = {
            let mut state = self.lock();
            state.open = visible;
            state.last_view
        };
        if visible {
            self.view().show_view(last_view);
        }
        self.view().set_fab_active(visible);
        log::debug!("[OVERLAY] FAB toggled, visible={}", visible);
    }

    /// `inside` tells whether the click landed on the overlay itself.
    pub fn handle_outside_click(&self, inside: bool) {
        if inside || !self.view().is_visible() {
            return;
        }
        self.lock().open = false;
        self.view().hide();
        self.view().set_fab_active(false);
    }

    /// Move to `target`, releasing the previous view's pending results.
    /// Returns the new epoch.
    fn enter(&self, target: ViewKind) -> u64 {
        let (epoch, stream) = {
            let mut state = self.lock();
            let leaving_chat = state.last_view == ViewKind::Chat && target != ViewKind::Chat;
            state.epoch += 1;
            state.last_view = target;
            state.open = true;
            if leaving_chat {
                state.chat.clear();
            }
            (state.epoch, state.chat_stream.take())
        };
        if let Some((_, token)) = stream {
            log::info!("[CHAT] Leaving chat, cancelling reply");
            token.cancel();
        }
        self.view().show_view(target);
        if !self.view().is_visible() {
            self.view().show();
        }
        self.view().set_fab_active(true);
        epoch
    }

    pub fn handle_back(&self) {
        self.enter(ViewKind::Menu);
    }

    pub async fn handle_menu_select(&self, intent: MenuIntent) {
        log::info!("[OVERLAY] Menu selected: {}", intent);
        let epoch = self.enter(intent.view());
        match intent {
            MenuIntent::Summary => self.run_summary(epoch).await,
            MenuIntent::Translate => {
                self.view().set_languages(&LANGUAGES);
                let target = self
                    .view()
                    .selected_language()
                    .unwrap_or_else(|| DEFAULT_TARGET.to_string());
                let status = self.inner.services.translate.check_available("en", &target).await;
                self.show_notice(ViewKind::Translation, epoch, status);
            }
            MenuIntent::Chat => self.open_chat(epoch),
            MenuIntent::Rewrite => {
                let options = self.view().rewrite_options();
                let status = self.inner.services.rewrite.check_available(&options).await;
                self.show_notice(ViewKind::Rewrite, epoch, status);
            }
            MenuIntent::Prompt => {
                self.refresh_templates();
                let status = self.inner.services.prompt.check_available().await;
                self.show_notice(ViewKind::Prompt, epoch, status);
            }
            MenuIntent::Image => {
                self.view().set_image_suggestions(&SUGGESTIONS);
                let status = self.inner.services.image.check_available().await;
                self.show_notice(ViewKind::Image, epoch, status);
            }
        }
    }

    // ── Shared plumbing ─────────────────────────────────────────────

    fn show_notice(&self, view: ViewKind, epoch: u64, status: crate::ai::CapabilityStatus) {
        if self.is_current(epoch) {
            self.view().set_status(view, &messages::availability_notice(view, status));
        }
    }

    /// Progress sink that relabels `view`'s spinner while `epoch` is current.
    fn progress_for(&self, view: ViewKind, epoch: u64) -> impl Fn(ProgressPhase) + Send + Sync + '_ {
        move |phase| {
            if let Some(label) = messages::loading_label(view, phase) {
                if self.is_current(epoch) {
                    self.view().set_loading(view, &label);
                }
            }
        }
    }

    /// Write a finished run into its view, unless the user moved on.
    fn settle(&self, view: ViewKind, epoch: u64, result: Result<String, CodedError>) {
        if !self.is_current(epoch) {
            log::debug!("[OVERLAY] Dropping stale {} result", view);
            return;
        }
        match result {
            Ok(text) => self.view().set_result(view, &text),
            Err(e) => {
                log::warn!("[OVERLAY] {} failed ({}): {}", view, e.code, e.message);
                self.view().set_result(view, &messages::error_message(view, &e));
            }
        }
    }

    fn page_text(&self) -> String {
        page_text(self.inner.page.as_ref(), self.inner.config.page_text_limit)
    }

    fn refresh_templates(&self) {
        let recent = self.recent_prompts();
        self.view().set_prompt_templates(&default_templates(), &recent);
    }

    // ── Single-shot views ───────────────────────────────────────────

    async fn run_summary(&self, epoch: u64) {
        self.view().set_loading(ViewKind::Summary, messages::PREPARING);
        let content = self.page_text();
        let progress = self.progress_for(ViewKind::Summary, epoch);
        let result = self.inner.services.summarize.run(&content, &progress).await;
        self.settle(ViewKind::Summary, epoch, result);
    }

    /// Translate the page into the language picked in the translation view.
    pub async fn submit_translation(&self) {
        let epoch = self.current_epoch();
        let target = self.view().selected_language().unwrap_or_default();
        self.view().set_loading(ViewKind::Translation, messages::PREPARING);
        let content = self.page_text();
        let progress = self.progress_for(ViewKind::Translation, epoch);
        let result = self
            .inner
            .services
            .translate
            .run(&content, &target, None, &progress)
            .await;

        let result = result.map(|outcome| {
            if self.is_current(epoch) {
                self.view().set_status(
                    ViewKind::Translation,
                    &format!(
                        "{} → {}",
                        language_name(&outcome.source_language),
                        language_name(&outcome.target_language)
                    ),
                );
            }
            outcome.text
        });
        self.settle(ViewKind::Translation, epoch, result);
    }

    pub async fn submit_rewrite(&self) {
        let epoch = self.current_epoch();
        let text = self.view().input_text(ViewKind::Rewrite);
        let options = self.view().rewrite_options();
        self.view().set_loading(ViewKind::Rewrite, messages::PREPARING);
        let progress = self.progress_for(ViewKind::Rewrite, epoch);
        let result = self.inner.services.rewrite.run(&text, &options, &progress).await;
        self.settle(ViewKind::Rewrite, epoch, result);
    }

    /// Run the selected template on the prompt view's input. Successful runs
    /// are recorded in the recent list.
    pub async fn submit_prompt(&self) {
        let epoch = self.current_epoch();
        let Some(template) = self.view().selected_template().and_then(|id| find_template(&id)) else {
            self.view().set_status(ViewKind::Prompt, NO_TEMPLATE);
            return;
        };
        let input = self.view().input_text(ViewKind::Prompt);
        self.view().set_loading(ViewKind::Prompt, messages::PREPARING);
        let progress = self.progress_for(ViewKind::Prompt, epoch);
        let result = self
            .inner
            .services
            .prompt
            .run(&template.template, &input, None, &progress)
            .await;

        let result = result.map(|text| {
            self.lock().recent.record(&template, &input);
            if text.is_empty() {
                messages::EMPTY_RESPONSE.to_string()
            } else {
                text
            }
        });
        let succeeded = result.is_ok();
        self.settle(ViewKind::Prompt, epoch, result);
        if succeeded && self.is_current(epoch) {
            self.refresh_templates();
        }
    }

    /// Analyze an uploaded image, answering the image view's query.
    pub async fn submit_image(&self, image: ImageInput) {
        let epoch = self.current_epoch();
        if validate_image(&image).is_ok() {
            self.view().show_image_metadata(&image_metadata(&image));
        }
        let query = self.view().input_text(ViewKind::Image);
        self.view().set_loading(ViewKind::Image, messages::PREPARING);
        let progress = self.progress_for(ViewKind::Image, epoch);
        let result = self.inner.services.image.run(image, &query, &progress).await;
        self.settle(ViewKind::Image, epoch, result);
    }

    // ── Chat ────────────────────────────────────────────────────────

    /// Fresh conversation; suggestions load in the background while the
    /// user can already type.
    fn open_chat(&self, epoch: u64) {
        self.lock().chat.clear();
        self.view().clear_chat();
        self.view().set_send_enabled(true);

        let this = self.clone();
        tokio::spawn(async move {
            let content = this.page_text();
            let questions = this
                .inner
                .services
                .chat
                .suggested_questions(&content, &NoProgress)
                .await;
            if this.is_current(epoch) {
                this.view().show_chat_suggestions(&questions);
            }
        });
    }

    /// Stop the in-flight reply, if any. The partial reply stays on screen
    /// but is not kept in history.
    pub fn cancel_chat(&self) {
        if let Some((_, token)) = self.lock().chat_stream.take() {
            log::info!("[CHAT] Reply cancelled by user");
            token.cancel();
        }
    }

    /// Send a user message and stream the assistant's reply. The exchange
    /// enters history only once a non-empty reply completes.
    pub async fn submit_chat(&self, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }

        let token = CancellationToken::new();
        let (epoch, seq, history, previous) = {
            let mut state = self.lock();
            let history = state.chat.turns();
            state.next_stream += 1;
            let seq = state.next_stream;
            let previous = state.chat_stream.replace((seq, token.clone()));
            (state.epoch, seq, history, previous)
        };
        if let Some((_, previous)) = previous {
            previous.cancel();
        }

        self.view().append_chat_message(&ChatTurn::user(message));
        self.view().set_send_enabled(false);
        self.view().show_typing_indicator();

        let content = self.page_text();
        let started = AtomicBool::new(false);
        let on_chunk = |chunk: &str| {
            if token.is_cancelled() || !self.is_current(epoch) {
                return;
            }
            if !started.swap(true, Ordering::SeqCst) {
                self.view().remove_typing_indicator();
                self.view().begin_assistant_stream();
            }
            self.view().append_assistant_chunk(chunk);
        };

        let result = self
            .inner
            .services
            .chat
            .run_streaming(message, &history, &content, &NoProgress, &on_chunk, &token)
            .await;

        let superseded = {
            let mut state = self.lock();
            if state.chat_stream.as_ref().is_some_and(|(current, _)| *current == seq) {
                state.chat_stream = None;
            }
            state.next_stream != seq
        };
        // A newer submission owns the typing indicator and send button now.
        if superseded {
            log::debug!("[CHAT] Reply #{} superseded", seq);
            return;
        }

        if started.load(Ordering::SeqCst) {
            self.view().finish_assistant_stream();
        } else {
            self.view().remove_typing_indicator();
        }
        self.view().set_send_enabled(true);

        if !self.is_current(epoch) {
            return;
        }
        match result {
            Ok(outcome) if outcome.cancelled => {
                log::debug!("[CHAT] Cancelled reply not kept in history");
            }
            Ok(outcome) => {
                let reply = outcome.text.trim().to_string();
                if reply.is_empty() {
                    self.view()
                        .append_chat_message(&ChatTurn::assistant(messages::EMPTY_RESPONSE));
                } else {
                    let mut state = self.lock();
                    state.chat.push(ChatTurn::user(message));
                    state.chat.push(ChatTurn::assistant(reply));
                }
            }
            Err(e) => {
                log::warn!("[CHAT] Reply failed ({}): {}", e.code, e.message);
                let text = messages::error_message(ViewKind::Chat, &e);
                self.view().append_chat_message(&ChatTurn::assistant(text));
            }
        }
    }
}
