//! AI session services, one per capability.
//!
//! Every service runs the same single-shot pipeline:
//!   1. reject blank input with `no-content`
//!   2. probe availability, reject `unavailable` with `ai-unavailable`
//!   3. open a fresh session, bracketed by `download_*` when the model
//!      has to be fetched first
//!   4. build the instruction text
//!   5. invoke, bracketed by `inference_*` on success and failure alike
//!   6. drop the session guard (destroys the session on every path)
//!   7. reject blank output with the capability's empty-result code
//!
//! Steps 2, 3 and 5 live here; each service owns 1, 4 and 7.

pub mod chat;
pub mod image;
pub mod language;
pub mod progress;
pub mod prompt;
pub mod prompts;
pub mod rewrite;
pub mod summarize;
pub mod translate;

pub use chat::{ChatRole, ChatService, ChatTurn, StreamOutcome};
pub use image::ImageAnalysisService;
pub use language::{DetectedLanguage, LanguageDetectionService};
pub use progress::{NoProgress, ProgressPhase, ProgressSink};
pub use prompt::{PromptService, PromptTemplate, RecentPrompt, RecentPrompts};
pub use rewrite::{RewriteFormat, RewriteLength, RewriteOptions, RewriteService, RewriteTone};
pub use summarize::SummarizeService;
pub use translate::{TranslateService, TranslationOutcome};

use crate::ai::{
    CapabilityBridge, CapabilityKind, CapabilityStatus, CodedError, ErrorCode, SessionGuard,
    SessionInput, SessionOptions,
};

/// Availability gate. `Unavailable` becomes `ai-unavailable` with the
/// caller's message.
pub(crate) async fn require_available(
    bridge: &CapabilityBridge,
    kind: CapabilityKind,
    params: &SessionOptions,
    unavailable_message: &str,
) -> Result<CapabilityStatus, CodedError> {
    let status = bridge.check_availability(kind, params).await;
    if status == CapabilityStatus::Unavailable {
        return Err(CodedError::new(ErrorCode::AiUnavailable, unavailable_message));
    }
    Ok(status)
}

/// Open a session for one operation.
pub(crate) async fn open_session(
    bridge: &CapabilityBridge,
    kind: CapabilityKind,
    status: CapabilityStatus,
    options: &SessionOptions,
    progress: &dyn ProgressSink,
    failure_message: &str,
) -> Result<SessionGuard, CodedError> {
    let downloading = status == CapabilityStatus::Downloadable;
    if downloading {
        progress.emit(ProgressPhase::DownloadStart);
    }
    let session = bridge
        .create_session(kind, options)
        .await
        .map_err(|e| CodedError::inference_failed(failure_message, e))?;
    if downloading {
        progress.emit(ProgressPhase::DownloadComplete);
    }
    Ok(session)
}

/// Invoke once. `inference_complete` follows `inference_start` whatever
/// the outcome.
pub(crate) async fn infer(
    session: &mut SessionGuard,
    input: SessionInput,
    progress: &dyn ProgressSink,
    failure_message: &str,
) -> Result<String, CodedError> {
    progress.emit(ProgressPhase::InferenceStart);
    let result = session.invoke(input).await;
    progress.emit(ProgressPhase::InferenceComplete);
    result.map_err(|e| {
        log::error!("[{}] inference failed: {}", session.kind(), e);
        CodedError::inference_failed(failure_message, e)
    })
}

/// Steps 2, 3 and 5 back to back, returning the trimmed output.
pub(crate) async fn run_single_shot(
    bridge: &CapabilityBridge,
    kind: CapabilityKind,
    options: &SessionOptions,
    input: SessionInput,
    progress: &dyn ProgressSink,
    messages: &FailureMessages<'_>,
) -> Result<String, CodedError> {
    let status = require_available(bridge, kind, options, messages.unavailable).await?;
    let mut session = open_session(bridge, kind, status, options, progress, messages.failed).await?;
    let output = infer(&mut session, input, progress, messages.failed).await?;
    Ok(output.trim().to_string())
}

/// Service-specific wording for the coded errors the shared steps raise.
pub(crate) struct FailureMessages<'a> {
    pub unavailable: &'a str,
    pub failed: &'a str,
}

/// Blank input check shared by every service.
pub(crate) fn require_content<'a>(input: &'a str, message: &str) -> Result<&'a str, CodedError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CodedError::new(ErrorCode::NoContent, message));
    }
    Ok(trimmed)
}
