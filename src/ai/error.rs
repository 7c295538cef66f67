//! Error taxonomy.
//!
//! `BridgeError` is what transports and sessions fail with. It carries no
//! user-facing code. Services translate it into a `CodedError`, whose
//! `code` drives the controller's choice of message.

use super::types::CapabilityKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fixed error codes surfaced to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    NoContent,
    AiUnavailable,
    InvalidLanguage,
    SameLanguage,
    EmptySummary,
    EmptyTranslation,
    EmptyRewrite,
    InvalidImage,
    InferenceFailed,
    HostError,
    InvalidSession,
    UnknownOp,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoContent => "no-content",
            Self::AiUnavailable => "ai-unavailable",
            Self::InvalidLanguage => "invalid-language",
            Self::SameLanguage => "same-language",
            Self::EmptySummary => "empty-summary",
            Self::EmptyTranslation => "empty-translation",
            Self::EmptyRewrite => "empty-rewrite",
            Self::InvalidImage => "invalid-image",
            Self::InferenceFailed => "inference-failed",
            Self::HostError => "host-error",
            Self::InvalidSession => "invalid-session",
            Self::UnknownOp => "unknown-op",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "no-content" => Self::NoContent,
            "ai-unavailable" => Self::AiUnavailable,
            "invalid-language" => Self::InvalidLanguage,
            "same-language" => Self::SameLanguage,
            "empty-summary" => Self::EmptySummary,
            "empty-translation" => Self::EmptyTranslation,
            "empty-rewrite" => Self::EmptyRewrite,
            "invalid-image" => Self::InvalidImage,
            "inference-failed" => Self::InferenceFailed,
            "host-error" => Self::HostError,
            "invalid-session" => Self::InvalidSession,
            "unknown-op" => Self::UnknownOp,
            _ => return None,
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uncoded failure from a transport, the relay, or a host session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("{0} is not reachable from this context")]
    Unreachable(CapabilityKind),

    #[error("relay request timed out after {0}ms")]
    Timeout(u64),

    #[error("relay transport failed: {0}")]
    Transport(String),

    #[error("host replied {code}: {message}")]
    Host { code: ErrorCode, message: String },

    #[error("failed to create {kind} session: {message}")]
    Create { kind: CapabilityKind, message: String },

    #[error("session call failed: {0}")]
    Invoke(String),
}

/// Failure returned by every session service.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CodedError {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<BridgeError>,
}

impl CodedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an uncoded failure at the service boundary.
    pub fn inference_failed(message: impl Into<String>, source: BridgeError) -> Self {
        Self {
            code: ErrorCode::InferenceFailed,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}
