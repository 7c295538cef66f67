//! Page summarization via the host `Summarizer`.

use super::prompts::summarize_instruction;
use super::{require_content, run_single_shot, FailureMessages, ProgressSink};
use crate::ai::{
    CapabilityBridge, CapabilityKind, CapabilityStatus, CodedError, ErrorCode, SessionInput,
    SessionOptions,
};

const NO_CONTENT: &str = "No readable content found on this page.";
const UNAVAILABLE: &str = "AI summarization is not available.";
const FAILED: &str = "Failed to summarize via AI.";
const EMPTY: &str = "Empty AI summary.";

#[derive(Clone)]
pub struct SummarizeService {
    bridge: CapabilityBridge,
}

impl SummarizeService {
    pub fn new(bridge: CapabilityBridge) -> Self {
        Self { bridge }
    }

    /// Options the summarizer session is created with.
    pub fn session_options() -> SessionOptions {
        SessionOptions::new()
            .with("type", "key-points")
            .with("format", "markdown")
            .with("length", "medium")
    }

    pub async fn check_available(&self) -> CapabilityStatus {
        self.bridge
            .check_availability(CapabilityKind::Summarizer, &Self::session_options())
            .await
    }

    /// Summarize `content` into 4-6 bullet points.
    pub async fn run(&self, content: &str, progress: &dyn ProgressSink) -> Result<String, CodedError> {
        let content = require_content(content, NO_CONTENT)?;
        log::info!("[SUMMARIZE] {} chars of page text", content.chars().count());

        let summary = run_single_shot(
            &self.bridge,
            CapabilityKind::Summarizer,
            &Self::session_options(),
            SessionInput::text(summarize_instruction(content)),
            progress,
            &FailureMessages {
                unavailable: UNAVAILABLE,
                failed: FAILED,
            },
        )
        .await?;

        if summary.is_empty() {
            return Err(CodedError::new(ErrorCode::EmptySummary, EMPTY));
        }
        log::info!("[SUMMARIZE] Summary ready ({} chars)", summary.chars().count());
        Ok(summary)
    }
}
