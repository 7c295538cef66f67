//! Text rewriting via the host `Rewriter`.

use super::{require_content, run_single_shot, FailureMessages, ProgressSink};
use crate::ai::{
    CapabilityBridge, CapabilityKind, CapabilityStatus, CodedError, ErrorCode, SessionInput,
    SessionOptions,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const NO_CONTENT: &str = "No text provided to rewrite.";
const UNAVAILABLE: &str = "AI rewriting is not available.";
const FAILED: &str = "Failed to rewrite via AI.";
const EMPTY: &str = "The model returned an empty rewrite.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteTone {
    #[default]
    AsIs,
    MoreFormal,
    MoreCasual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteLength {
    #[default]
    AsIs,
    Shorter,
    Longer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteFormat {
    AsIs,
    #[default]
    Markdown,
    PlainText,
}

macro_rules! wire_str {
    ($ty:ty { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($s => Ok(Self::$variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($ty), other)),
                }
            }
        }
    };
}

wire_str!(RewriteTone { AsIs => "as-is", MoreFormal => "more-formal", MoreCasual => "more-casual" });
wire_str!(RewriteLength { AsIs => "as-is", Shorter => "shorter", Longer => "longer" });
wire_str!(RewriteFormat { AsIs => "as-is", Markdown => "markdown", PlainText => "plain-text" });

/// Everything the rewrite view lets the user pick, plus optional context.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewriteOptions {
    pub tone: RewriteTone,
    pub length: RewriteLength,
    pub format: RewriteFormat,
    pub context: Option<String>,
    pub shared_context: Option<String>,
    pub output_language: Option<String>,
}

impl RewriteOptions {
    /// Options the rewriter session is created (and probed) with.
    /// `as-is` tone and length are left out.
    pub fn session_options(&self) -> SessionOptions {
        let mut options = SessionOptions::new();
        if self.tone != RewriteTone::AsIs {
            options.insert("tone", self.tone.as_str());
        }
        if self.length != RewriteLength::AsIs {
            options.insert("length", self.length.as_str());
        }
        options.insert("format", self.format.as_str());
        if let Some(shared) = non_blank(&self.shared_context) {
            options.insert("sharedContext", shared);
        }
        if let Some(language) = non_blank(&self.output_language) {
            options.insert("outputLanguage", language);
        }
        options
    }

    /// Per-call options sent alongside the text.
    pub fn request_options(&self) -> SessionOptions {
        let mut options = SessionOptions::new();
        if let Some(context) = non_blank(&self.context) {
            options.insert("context", context);
        }
        if self.tone != RewriteTone::AsIs {
            options.insert("tone", self.tone.as_str());
        }
        if self.length != RewriteLength::AsIs {
            options.insert("length", self.length.as_str());
        }
        options.insert("format", self.format.as_str());
        options
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Clone)]
pub struct RewriteService {
    bridge: CapabilityBridge,
}

impl RewriteService {
    pub fn new(bridge: CapabilityBridge) -> Self {
        Self { bridge }
    }

    pub async fn check_available(&self, options: &RewriteOptions) -> CapabilityStatus {
        self.bridge
            .check_availability(CapabilityKind::Rewriter, &options.session_options())
            .await
    }

    pub async fn run(
        &self,
        text: &str,
        options: &RewriteOptions,
        progress: &dyn ProgressSink,
    ) -> Result<String, CodedError> {
        let text = require_content(text, NO_CONTENT)?;
        log::info!(
            "[REWRITE] {} chars, tone={} length={} format={}",
            text.chars().count(),
            options.tone.as_str(),
            options.length.as_str(),
            options.format.as_str()
        );

        let output = run_single_shot(
            &self.bridge,
            CapabilityKind::Rewriter,
            &options.session_options(),
            SessionInput::text(text).with_options(options.request_options()),
            progress,
            &FailureMessages {
                unavailable: UNAVAILABLE,
                failed: FAILED,
            },
        )
        .await?;

        if output.is_empty() {
            return Err(CodedError::new(ErrorCode::EmptyRewrite, EMPTY));
        }
        Ok(output)
    }
}
