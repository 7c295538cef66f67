//! Page-aware chat via the host `LanguageModel`.
//!
//! Two reply paths share one prompt builder: `run` waits for the whole
//! reply, `run_streaming` forwards chunks as they arrive and stops quietly
//! when its cancellation token fires.

use super::prompts::{chat_instruction, suggested_questions_instruction};
use super::{
    infer, open_session, require_available, require_content, ProgressPhase, ProgressSink,
};
use crate::ai::{
    CapabilityBridge, CapabilityKind, CapabilityStatus, CodedError, SessionInput, SessionOptions,
};
use futures::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;

const NO_CONTENT: &str = "Please type a message.";
const UNAVAILABLE: &str = "AI chat is not available.";
const FAILED: &str = "Failed to create chat session";
const MAX_SUGGESTIONS: usize = 5;

/// Asked when the page yields no suggestions of its own.
pub const DEFAULT_QUESTIONS: [&str; 3] = [
    "What is this page about?",
    "Can you explain the main points?",
    "What should I take away from this?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Result of a streamed reply. `cancelled` replies carry whatever arrived
/// before the token fired.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamOutcome {
    pub text: String,
    pub cancelled: bool,
}

#[derive(Clone)]
pub struct ChatService {
    bridge: CapabilityBridge,
}

impl ChatService {
    pub fn new(bridge: CapabilityBridge) -> Self {
        Self { bridge }
    }

    pub async fn check_available(&self) -> CapabilityStatus {
        self.bridge
            .check_availability(CapabilityKind::LanguageModel, &SessionOptions::new())
            .await
    }

    fn build_input(message: &str, history: &[ChatTurn], page_content: &str) -> SessionInput {
        let turns = history.iter().map(|t| (t.role.as_str(), t.content.as_str()));
        SessionInput::text(chat_instruction(turns, page_content, message))
    }

    /// Whole-reply chat turn.
    pub async fn run(
        &self,
        message: &str,
        history: &[ChatTurn],
        page_content: &str,
        progress: &dyn ProgressSink,
    ) -> Result<String, CodedError> {
        let message = require_content(message, NO_CONTENT)?;
        let options = SessionOptions::new();
        let status =
            require_available(&self.bridge, CapabilityKind::LanguageModel, &options, UNAVAILABLE).await?;
        let mut session = open_session(
            &self.bridge,
            CapabilityKind::LanguageModel,
            status,
            &options,
            progress,
            FAILED,
        )
        .await?;
        let reply = infer(
            &mut session,
            Self::build_input(message, history, page_content),
            progress,
            FAILED,
        )
        .await?;
        Ok(reply.trim().to_string())
    }

    /// Streamed chat turn. Each chunk goes to `on_chunk` as it arrives; once
    /// `cancel` fires no further chunk is forwarded and the call resolves
    /// with `cancelled: true`.
    pub async fn run_streaming(
        &self,
        message: &str,
        history: &[ChatTurn],
        page_content: &str,
        progress: &dyn ProgressSink,
        on_chunk: &(dyn Fn(&str) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, CodedError> {
        let message = require_content(message, NO_CONTENT)?;
        let options = SessionOptions::new();
        let status =
            require_available(&self.bridge, CapabilityKind::LanguageModel, &options, UNAVAILABLE).await?;
        let mut session = open_session(
            &self.bridge,
            CapabilityKind::LanguageModel,
            status,
            &options,
            progress,
            FAILED,
        )
        .await?;

        if cancel.is_cancelled() {
            log::info!("[CHAT] Cancelled before inference");
            return Ok(StreamOutcome {
                text: String::new(),
                cancelled: true,
            });
        }

        progress.emit(ProgressPhase::InferenceStart);
        // Sessions without native streaming only resolve once the whole
        // reply exists, so the token is watched here as well.
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = session.invoke_streaming(Self::build_input(message, history, page_content)) => Some(result),
        };
        let mut stream = match opened {
            Some(Ok(stream)) => stream,
            None => {
                progress.emit(ProgressPhase::InferenceComplete);
                log::info!("[CHAT] Cancelled while waiting for the reply");
                return Ok(StreamOutcome {
                    text: String::new(),
                    cancelled: true,
                });
            }
            Some(Err(e)) => {
                progress.emit(ProgressPhase::InferenceComplete);
                if cancel.is_cancelled() {
                    return Ok(StreamOutcome {
                        text: String::new(),
                        cancelled: true,
                    });
                }
                log::error!("[CHAT] Inference failed: {}", e);
                return Err(CodedError::inference_failed(FAILED, e));
            }
        };

        let mut outcome = StreamOutcome::default();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.cancelled = true;
                    break;
                }
                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        outcome.text.push_str(&chunk);
                        on_chunk(&chunk);
                    }
                    Some(Err(e)) => {
                        progress.emit(ProgressPhase::InferenceComplete);
                        if cancel.is_cancelled() {
                            outcome.cancelled = true;
                            return Ok(outcome);
                        }
                        log::error!("[CHAT] Stream failed: {}", e);
                        return Err(CodedError::inference_failed(FAILED, e));
                    }
                    None => break,
                },
            }
        }
        progress.emit(ProgressPhase::InferenceComplete);

        if outcome.cancelled {
            log::info!("[CHAT] Reply cancelled after {} chars", outcome.text.len());
        } else {
            log::info!("[CHAT] Reply complete ({} chars)", outcome.text.len());
        }
        Ok(outcome)
    }

    /// 4-5 questions about the page, or the fixed defaults when the page
    /// is blank, the model is unavailable, the call fails or the reply has
    /// no usable JSON array. Never fails.
    pub async fn suggested_questions(&self, page_content: &str, progress: &dyn ProgressSink) -> Vec<String> {
        if page_content.trim().is_empty() {
            return default_questions();
        }
        let options = SessionOptions::new();
        let reply = async {
            let status =
                require_available(&self.bridge, CapabilityKind::LanguageModel, &options, UNAVAILABLE)
                    .await?;
            let mut session = open_session(
                &self.bridge,
                CapabilityKind::LanguageModel,
                status,
                &options,
                progress,
                FAILED,
            )
            .await?;
            infer(
                &mut session,
                SessionInput::text(suggested_questions_instruction(page_content)),
                progress,
                FAILED,
            )
            .await
        }
        .await;

        match reply {
            Ok(reply) => parse_suggested_questions(&reply).unwrap_or_else(|| {
                log::warn!("[CHAT] Suggestion reply had no question array");
                default_questions()
            }),
            Err(e) => {
                log::warn!("[CHAT] Suggestions unavailable: {}", e);
                default_questions()
            }
        }
    }
}

pub fn default_questions() -> Vec<String> {
    DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
}

fn array_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)\[.*\]").ok())
        .as_ref()
}

/// Pull the bracketed JSON array out of a model reply that may wrap it
/// in prose. Keeps string entries only, at most five.
pub fn parse_suggested_questions(reply: &str) -> Option<Vec<String>> {
    let array = array_pattern()?.find(reply)?;
    let values: Vec<serde_json::Value> = serde_json::from_str(array.as_str()).ok()?;
    let questions: Vec<String> = values
        .into_iter()
        .filter_map(|v| v.as_str().map(str::trim).filter(|q| !q.is_empty()).map(String::from))
        .take(MAX_SUGGESTIONS)
        .collect();
    (!questions.is_empty()).then_some(questions)
}
