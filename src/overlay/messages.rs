//! User-facing wording: loading labels per progress phase and the message
//! shown for each error code, per view.

use super::view::ViewKind;
use crate::ai::{CapabilityStatus, CodedError, ErrorCode};
use crate::services::ProgressPhase;

pub const PREPARING: &str = "Preparing model…";
pub const DOWNLOADING: &str = "Downloading model…";
pub const DETECTING: &str = "Detecting language…";
pub const DOWNLOAD_NOTICE: &str = "The model will download on first use.";
pub const EMPTY_RESPONSE: &str = "The model returned an empty response.";

/// (present participle, noun) used to word loading labels and errors.
fn verb(view: ViewKind) -> (&'static str, &'static str) {
    match view {
        ViewKind::Summary => ("Summarizing", "summarization"),
        ViewKind::Translation => ("Translating", "translation"),
        ViewKind::Rewrite => ("Rewriting", "rewriting"),
        ViewKind::Prompt => ("Running prompt", "prompting"),
        ViewKind::Image => ("Analyzing image", "image analysis"),
        ViewKind::Chat => ("Thinking", "chat"),
        ViewKind::Menu => ("Working", "assistance"),
    }
}

/// Loading label for a progress phase, `None` when the label shouldn't change.
pub fn loading_label(view: ViewKind, phase: ProgressPhase) -> Option<String> {
    let (doing, _) = verb(view);
    match phase {
        ProgressPhase::DownloadStart => Some(DOWNLOADING.to_string()),
        ProgressPhase::DownloadComplete => Some(format!("Model ready. {}…", doing)),
        ProgressPhase::InferenceStart => Some(format!("{}…", doing)),
        ProgressPhase::DetectionStart => Some(DETECTING.to_string()),
        ProgressPhase::InferenceComplete | ProgressPhase::Fallback => None,
    }
}

pub fn unavailable_message(view: ViewKind) -> String {
    let (_, noun) = verb(view);
    format!("AI {} is not available in this Chrome build.", noun)
}

/// Status line shown when an input view opens. Empty when ready.
pub fn availability_notice(view: ViewKind, status: CapabilityStatus) -> String {
    match status {
        CapabilityStatus::Ready => String::new(),
        CapabilityStatus::Downloadable => DOWNLOAD_NOTICE.to_string(),
        CapabilityStatus::Unavailable => unavailable_message(view),
    }
}

/// Message shown in `view` for a failed run.
pub fn error_message(view: ViewKind, error: &CodedError) -> String {
    let (_, noun) = verb(view);
    match error.code {
        ErrorCode::AiUnavailable => unavailable_message(view),
        ErrorCode::NoContent => match view {
            ViewKind::Summary | ViewKind::Translation => "No readable content found on this page.".to_string(),
            ViewKind::Rewrite => "Enter some text to rewrite.".to_string(),
            ViewKind::Prompt => "Enter some text for the prompt.".to_string(),
            _ => "Please enter a message.".to_string(),
        },
        ErrorCode::InvalidLanguage => "Please select a target language.".to_string(),
        // Both already carry user-facing wording.
        ErrorCode::SameLanguage | ErrorCode::InvalidImage => error.message.clone(),
        ErrorCode::EmptySummary => "The model returned an empty summary.".to_string(),
        ErrorCode::EmptyTranslation => "The model returned an empty translation.".to_string(),
        ErrorCode::EmptyRewrite => "The model returned an empty rewrite.".to_string(),
        ErrorCode::InferenceFailed if view == ViewKind::Chat => fallback_message(view),
        ErrorCode::InferenceFailed => format!("AI {} failed. Please try again.", noun),
        ErrorCode::HostError | ErrorCode::InvalidSession | ErrorCode::UnknownOp => {
            fallback_message(view)
        }
    }
}

fn fallback_message(view: ViewKind) -> String {
    match view {
        ViewKind::Summary => "Unable to summarize this page.",
        ViewKind::Translation => "Unable to translate this page.",
        ViewKind::Rewrite => "Unable to rewrite this text.",
        ViewKind::Prompt => "Unable to run this prompt.",
        ViewKind::Image => "Unable to analyze this image.",
        ViewKind::Chat | ViewKind::Menu => "Sorry, something went wrong. Please try again.",
    }
    .to_string()
}
