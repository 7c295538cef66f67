//! Controller state machine driven through a recording view.

mod ai_fakes;

use ai_fakes::{registry_of, RecordingView, Reply, SpyCapability, ViewEvent};
use chrome_ai_overlay::ai::{CapabilityKind, CapabilityStatus, ImageInput};
use chrome_ai_overlay::overlay::messages::{self, DOWNLOAD_NOTICE, EMPTY_RESPONSE, PREPARING};
use chrome_ai_overlay::services::prompt::default_templates;
use chrome_ai_overlay::services::ChatTurn;
use chrome_ai_overlay::text::StaticPageText;
use chrome_ai_overlay::{
    build_overlay, InjectionGuard, MenuIntent, OverlayBootstrapper, OverlayConfig,
    OverlayController, OverlayState, ViewKind,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use CapabilityKind::*;
use CapabilityStatus::*;

const ARTICLE: &str = "Foxes are small omnivorous mammals. They live on every continent except Antarctica.";

fn overlay(spies: &[Arc<SpyCapability>], page: &str) -> (OverlayController, Arc<RecordingView>) {
    let view = RecordingView::new();
    let controller = build_overlay(
        registry_of(spies),
        None,
        view.clone(),
        Arc::new(StaticPageText::new(page)),
        OverlayConfig::default(),
    );
    controller.initialize();
    view.clear_events();
    (controller, view)
}

async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..50 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ── Lifecycle and visibility ─────────────────────────────────────────

#[tokio::test]
async fn initialize_renders_menu_once() {
    let view = RecordingView::new();
    let controller = build_overlay(
        registry_of(&[]),
        None,
        view.clone(),
        Arc::new(StaticPageText::new(ARTICLE)),
        OverlayConfig::default(),
    );

    controller.initialize();
    controller.initialize();
    assert_eq!(
        view.events(),
        vec![ViewEvent::MenuItems(6), ViewEvent::Hide, ViewEvent::FabActive(false)]
    );
    assert_eq!(controller.state(), OverlayState::Closed);
}

#[tokio::test]
async fn fab_toggles_between_closed_and_menu() {
    let (controller, view) = overlay(&[], ARTICLE);

    controller.handle_fab_click();
    assert_eq!(controller.state(), OverlayState::Open(ViewKind::Menu));
    assert_eq!(
        view.events(),
        vec![
            ViewEvent::Show,
            ViewEvent::ShowView(ViewKind::Menu),
            ViewEvent::FabActive(true)
        ]
    );

    view.clear_events();
    controller.handle_fab_click();
    assert_eq!(controller.state(), OverlayState::Closed);
    assert_eq!(view.events(), vec![ViewEvent::Hide, ViewEvent::FabActive(false)]);
}

#[tokio::test]
async fn outside_click_closes_and_fab_restores_last_view() {
    let summarizer = SpyCapability::new(Summarizer, Ready, Reply::text("- one"));
    let (controller, view) = overlay(&[summarizer], ARTICLE);

    controller.handle_menu_select(MenuIntent::Summary).await;
    controller.handle_outside_click(true);
    assert_eq!(controller.state(), OverlayState::Open(ViewKind::Summary));

    controller.handle_outside_click(false);
    assert_eq!(controller.state(), OverlayState::Closed);
    assert!(!view.events().is_empty());

    controller.handle_fab_click();
    assert_eq!(controller.state(), OverlayState::Open(ViewKind::Summary));
}

#[tokio::test]
async fn back_returns_to_menu() {
    let (controller, view) = overlay(&[], ARTICLE);
    controller.handle_menu_select(MenuIntent::Rewrite).await;
    controller.handle_back();
    assert_eq!(controller.state(), OverlayState::Open(ViewKind::Menu));
    assert_eq!(view.events().last(), Some(&ViewEvent::FabActive(true)));
    assert_eq!(view.count(&ViewEvent::ShowView(ViewKind::Menu)), 1);
}

#[tokio::test]
async fn destroy_hides_everything() {
    let (controller, view) = overlay(&[], ARTICLE);
    controller.handle_fab_click();
    view.clear_events();

    controller.destroy();
    assert_eq!(view.events(), vec![ViewEvent::Hide, ViewEvent::FabActive(false)]);
    assert_eq!(controller.state(), OverlayState::Closed);
}

// ── Single-shot views ────────────────────────────────────────────────

#[tokio::test]
async fn summary_walks_loading_labels_then_shows_result() {
    let summarizer = SpyCapability::new(Summarizer, Downloadable, Reply::text("- Foxes\n- Continents"));
    let (controller, view) = overlay(&[summarizer.clone()], ARTICLE);

    controller.handle_menu_select(MenuIntent::Summary).await;

    assert_eq!(
        view.loading_labels(ViewKind::Summary),
        vec![
            PREPARING.to_string(),
            "Downloading model…".to_string(),
            "Model ready. Summarizing…".to_string(),
            "Summarizing…".to_string(),
        ]
    );
    assert_eq!(view.results(ViewKind::Summary), vec!["- Foxes\n- Continents"]);
    assert_eq!(summarizer.destroys(), 1);
}

#[tokio::test]
async fn summary_failures_use_view_wording() {
    let (controller, view) = overlay(&[], ARTICLE);
    controller.handle_menu_select(MenuIntent::Summary).await;
    assert_eq!(
        view.results(ViewKind::Summary),
        vec!["AI summarization is not available in this Chrome build."]
    );

    let summarizer = SpyCapability::new(Summarizer, Ready, Reply::text("- x"));
    let (controller, view) = overlay(&[summarizer.clone()], "   ");
    controller.handle_menu_select(MenuIntent::Summary).await;
    assert_eq!(
        view.results(ViewKind::Summary),
        vec!["No readable content found on this page."]
    );
    assert_eq!(summarizer.probes(), 0);
}

#[tokio::test]
async fn input_views_probe_on_entry() {
    let rewriter = SpyCapability::new(Rewriter, Downloadable, Reply::text("x"));
    let (controller, view) = overlay(&[rewriter.clone()], ARTICLE);

    controller.handle_menu_select(MenuIntent::Rewrite).await;
    assert_eq!(view.last_status(ViewKind::Rewrite).as_deref(), Some(DOWNLOAD_NOTICE));
    assert_eq!(rewriter.probes(), 1);
    assert_eq!(rewriter.creates(), 0);

    controller.handle_menu_select(MenuIntent::Image).await;
    assert_eq!(view.count(&ViewEvent::ImageSuggestions(8)), 1);
    assert_eq!(
        view.last_status(ViewKind::Image),
        Some(messages::unavailable_message(ViewKind::Image))
    );
}

#[tokio::test]
async fn translation_reports_language_pair() {
    let detector = SpyCapability::new(
        LanguageDetector,
        Ready,
        Reply::text(r#"[{"detectedLanguage":"en","confidence":0.99}]"#),
    );
    let translator = SpyCapability::new(Translator, Ready, Reply::text("Los zorros son pequeños."));
    let (controller, view) = overlay(&[detector, translator.clone()], ARTICLE);

    controller.handle_menu_select(MenuIntent::Translate).await;
    assert_eq!(view.count(&ViewEvent::Languages(12)), 1);
    assert_eq!(view.last_status(ViewKind::Translation).as_deref(), Some(""));

    view.select_language("Spanish");
    controller.submit_translation().await;
    assert_eq!(view.results(ViewKind::Translation), vec!["Los zorros son pequeños."]);
    assert_eq!(
        view.last_status(ViewKind::Translation).as_deref(),
        Some("English → Spanish")
    );
    assert!(view
        .loading_labels(ViewKind::Translation)
        .contains(&"Detecting language…".to_string()));
}

#[tokio::test]
async fn translation_to_page_language_is_explained() {
    let detector = SpyCapability::new(
        LanguageDetector,
        Ready,
        Reply::text(r#"[{"detectedLanguage":"en","confidence":0.99}]"#),
    );
    let translator = SpyCapability::new(Translator, Ready, Reply::text("x"));
    let (controller, view) = overlay(&[detector, translator.clone()], ARTICLE);

    controller.handle_menu_select(MenuIntent::Translate).await;
    view.select_language("English");
    controller.submit_translation().await;
    assert_eq!(view.results(ViewKind::Translation), vec!["Page is already in English."]);
    assert_eq!(translator.creates(), 0);
}

#[tokio::test]
async fn prompt_runs_are_recorded_most_recent_first() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::text("Here is your email."));
    let (controller, view) = overlay(&[model.clone()], ARTICLE);
    let templates = default_templates();

    controller.handle_menu_select(MenuIntent::Prompt).await;
    assert_eq!(view.count(&ViewEvent::Templates { catalog: 4, recent: 0 }), 1);

    controller.submit_prompt().await;
    assert_eq!(
        view.last_status(ViewKind::Prompt).as_deref(),
        Some("Select a prompt template.")
    );
    assert_eq!(model.creates(), 0);

    view.select_template(&templates[0].id);
    view.set_input(ViewKind::Prompt, "first input");
    controller.submit_prompt().await;
    view.select_template(&templates[1].id);
    view.set_input(ViewKind::Prompt, "second input");
    controller.submit_prompt().await;

    assert_eq!(view.results(ViewKind::Prompt).len(), 2);
    let recent = controller.recent_prompts();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].input, "second input");
    assert_eq!(recent[1].template_id, templates[0].id);
    assert_eq!(view.events().last(), Some(&ViewEvent::Templates { catalog: 4, recent: 2 }));
}

#[tokio::test]
async fn blank_prompt_reply_gets_placeholder() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::text("  "));
    let (controller, view) = overlay(&[model], ARTICLE);
    controller.handle_menu_select(MenuIntent::Prompt).await;

    view.select_template(&default_templates()[0].id);
    view.set_input(ViewKind::Prompt, "anything");
    controller.submit_prompt().await;
    assert_eq!(view.results(ViewKind::Prompt), vec![EMPTY_RESPONSE]);
}

#[tokio::test]
async fn image_submission_shows_metadata_then_analysis() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::text("A red square."));
    let (controller, view) = overlay(&[model.clone()], ARTICLE);
    controller.handle_menu_select(MenuIntent::Image).await;

    let mut png = Vec::new();
    image::RgbImage::new(4, 4)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    view.set_input(ViewKind::Image, "What colour is it?");
    controller
        .submit_image(ImageInput::new("square.png", "image/png", png))
        .await;

    assert_eq!(
        view.events()
            .iter()
            .filter(|e| matches!(e, ViewEvent::ImageMetadata(_)))
            .count(),
        1
    );
    assert_eq!(view.results(ViewKind::Image), vec!["A red square."]);
    assert!(model.last_input().unwrap().text.contains("What colour is it?"));

    view.clear_events();
    controller
        .submit_image(ImageInput::new("icon.svg", "image/svg+xml", vec![1]))
        .await;
    assert_eq!(
        view.results(ViewKind::Image),
        vec!["Only JPEG, PNG, GIF, and WebP images are supported"]
    );
    assert!(!view
        .events()
        .iter()
        .any(|e| matches!(e, ViewEvent::ImageMetadata(_))));
}

// ── Chat ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn opening_chat_loads_suggestions_in_background() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::text(r#"["Where do foxes live?","What do they eat?"]"#));
    let (controller, view) = overlay(&[model], ARTICLE);

    controller.handle_menu_select(MenuIntent::Chat).await;
    assert_eq!(view.count(&ViewEvent::ChatCleared), 1);
    assert_eq!(view.count(&ViewEvent::SendEnabled(true)), 1);

    let expected = ViewEvent::Suggestions(vec![
        "Where do foxes live?".to_string(),
        "What do they eat?".to_string(),
    ]);
    assert!(eventually(|| view.count(&expected) == 1).await);
}

#[tokio::test]
async fn chat_reply_streams_after_typing_indicator() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::chunks(&["Fox", "es ", "roam."]));
    let (controller, view) = overlay(&[model], ARTICLE);
    controller.handle_menu_select(MenuIntent::Chat).await;

    controller.submit_chat("  Where do foxes live?  ").await;

    let user = ViewEvent::ChatMessage(ChatTurn::user("Where do foxes live?"));
    let typing = view.position(&ViewEvent::TypingShown).unwrap();
    let removed = view.position(&ViewEvent::TypingRemoved).unwrap();
    let first_chunk = view.position(&ViewEvent::Chunk("Fox".into())).unwrap();
    let end = view.position(&ViewEvent::StreamEnd).unwrap();
    assert!(view.position(&user).unwrap() < typing);
    assert!(typing < removed);
    assert!(removed < first_chunk);
    assert!(first_chunk < end);
    assert_eq!(view.count(&ViewEvent::TypingRemoved), 1);

    let last_send = view
        .events()
        .into_iter()
        .rev()
        .find(|e| matches!(e, ViewEvent::SendEnabled(_)));
    assert_eq!(last_send, Some(ViewEvent::SendEnabled(true)));

    assert_eq!(
        controller.chat_history(),
        vec![ChatTurn::user("Where do foxes live?"), ChatTurn::assistant("Foxes roam.")]
    );
}

#[tokio::test]
async fn chat_history_keeps_last_ten_turns() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::chunks(&["ok"]));
    let (controller, _view) = overlay(&[model], ARTICLE);
    controller.handle_menu_select(MenuIntent::Chat).await;

    for i in 0..6 {
        controller.submit_chat(&format!("question {}", i)).await;
    }
    let history = controller.chat_history();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0], ChatTurn::user("question 1"));
    assert_eq!(history[9], ChatTurn::assistant("ok"));
}

#[tokio::test]
async fn cancelled_reply_is_not_kept() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::chunks_then_hang(&["Partial"]));
    let (controller, view) = overlay(&[model.clone()], ARTICLE);
    controller.handle_menu_select(MenuIntent::Chat).await;

    let canceller = controller.clone();
    tokio::join!(controller.submit_chat("Tell me more"), async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel_chat();
    });

    assert!(controller.chat_history().is_empty());
    assert_eq!(view.count(&ViewEvent::Chunk("Partial".into())), 1);
    assert_eq!(view.count(&ViewEvent::StreamEnd), 1);
    let last_send = view
        .events()
        .into_iter()
        .rev()
        .find(|e| matches!(e, ViewEvent::SendEnabled(_)));
    assert_eq!(last_send, Some(ViewEvent::SendEnabled(true)));
    assert!(eventually(|| model.destroys() == model.creates()).await);
}

#[tokio::test]
async fn chat_failure_becomes_assistant_message() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::Fail("oom".into()));
    let (controller, view) = overlay(&[model], ARTICLE);
    controller.handle_menu_select(MenuIntent::Chat).await;

    controller.submit_chat("Hi").await;
    let apology = ChatTurn::assistant("Sorry, something went wrong. Please try again.");
    assert_eq!(view.count(&ViewEvent::ChatMessage(apology)), 1);
    assert_eq!(view.count(&ViewEvent::TypingRemoved), 1);
    assert!(controller.chat_history().is_empty());
}

#[tokio::test]
async fn newer_message_keeps_its_own_typing_indicator() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::chunks_then_hang(&[]));
    let (controller, view) = overlay(&[model], ARTICLE);
    controller.handle_menu_select(MenuIntent::Chat).await;

    let second = controller.clone();
    let canceller = controller.clone();
    tokio::join!(
        controller.submit_chat("First question"),
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            second.submit_chat("Second question").await;
        },
        async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            canceller.cancel_chat();
        }
    );

    let indicator: Vec<ViewEvent> = view
        .events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                ViewEvent::TypingShown | ViewEvent::TypingRemoved | ViewEvent::SendEnabled(_)
            )
        })
        .collect();
    let last_shown = indicator
        .iter()
        .rposition(|e| *e == ViewEvent::TypingShown)
        .unwrap();
    assert_eq!(view.count(&ViewEvent::TypingShown), 2);
    assert_eq!(
        indicator[last_shown + 1..],
        [ViewEvent::TypingRemoved, ViewEvent::SendEnabled(true)]
    );
    assert!(controller.chat_history().is_empty());
}

#[tokio::test]
async fn leaving_chat_clears_history() {
    let model = SpyCapability::new(LanguageModel, Ready, Reply::chunks(&["Hello!"]));
    let (controller, _view) = overlay(&[model], ARTICLE);
    controller.handle_menu_select(MenuIntent::Chat).await;
    controller.submit_chat("Hi").await;
    assert_eq!(controller.chat_history().len(), 2);

    controller.handle_back();
    assert!(controller.chat_history().is_empty());
}

// ── Bootstrap ────────────────────────────────────────────────────────

#[tokio::test]
async fn bootstrapper_mounts_once_per_document() {
    let guard = Arc::new(InjectionGuard::default());
    let bootstrapper = OverlayBootstrapper::new(guard.clone());
    let builds = AtomicUsize::new(0);
    let view = RecordingView::new();

    let build = || {
        builds.fetch_add(1, Ordering::SeqCst);
        build_overlay(
            registry_of(&[]),
            None,
            view.clone(),
            Arc::new(StaticPageText::new(ARTICLE)),
            OverlayConfig::default(),
        )
    };

    let first = bootstrapper.run("doc-1", build);
    assert!(first.is_some());
    assert!(guard.is_initialised("doc-1"));
    assert_eq!(view.count(&ViewEvent::MenuItems(6)), 1);

    let second = bootstrapper.run("doc-1", build);
    assert!(second.is_none());
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    assert!(bootstrapper.run("doc-2", build).is_some());
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}
