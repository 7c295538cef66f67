//! The view contract the controller drives.
//!
//! Rendering (DOM, CSS, markdown, icons) lives behind this trait. The
//! controller only calls setters and reads the user's current input
//! through getters. Implementations use interior mutability; every method
//! takes `&self` so a view can be shared with spawned tasks.

use crate::catalog::MenuItem;
use crate::services::chat::ChatTurn;
use crate::services::image::ImageMetadata;
use crate::services::prompt::{PromptTemplate, RecentPrompt};
use crate::services::rewrite::RewriteOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Panels the overlay can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Menu,
    Summary,
    Translation,
    Chat,
    Rewrite,
    Prompt,
    Image,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Summary => "summary",
            Self::Translation => "translation",
            Self::Chat => "chat",
            Self::Rewrite => "rewrite",
            Self::Prompt => "prompt",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait OverlayView: Send + Sync {
    // ── Panel visibility ──
    fn show(&self);
    fn hide(&self);
    fn is_visible(&self) -> bool;
    fn toggle(&self) {
        if self.is_visible() {
            self.hide();
        } else {
            self.show();
        }
    }
    fn set_fab_active(&self, active: bool);
    fn set_menu_items(&self, items: &[MenuItem]);
    fn show_view(&self, view: ViewKind);

    // ── Per-view output ──
    fn set_loading(&self, view: ViewKind, label: &str);
    fn set_result(&self, view: ViewKind, text: &str);
    fn set_status(&self, view: ViewKind, message: &str);

    // ── Per-view input ──
    fn set_languages(&self, languages: &[(&str, &str)]);
    fn selected_language(&self) -> Option<String>;
    fn input_text(&self, view: ViewKind) -> String;
    fn selected_template(&self) -> Option<String>;
    fn set_prompt_templates(&self, templates: &[PromptTemplate], recent: &[RecentPrompt]);
    fn rewrite_options(&self) -> RewriteOptions;
    fn set_image_suggestions(&self, suggestions: &[&str]);
    fn show_image_metadata(&self, metadata: &ImageMetadata);

    // ── Chat ──
    fn append_chat_message(&self, turn: &ChatTurn);
    fn begin_assistant_stream(&self);
    fn append_assistant_chunk(&self, chunk: &str);
    fn finish_assistant_stream(&self);
    fn show_typing_indicator(&self);
    fn remove_typing_indicator(&self);
    fn show_chat_suggestions(&self, questions: &[String]);
    fn clear_chat(&self);
    fn set_send_enabled(&self, enabled: bool);
}
