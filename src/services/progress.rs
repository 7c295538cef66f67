//! Progress contract between session services and their callers.
//!
//! Phases for one operation arrive in a fixed order:
//! `download_start → download_complete → inference_start → inference_complete`,
//! with the download pair omitted when the model is already on the device.
//! Language detection adds `detection_start`; translation adds `fallback`
//! when detection could not run and English is assumed.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    DownloadStart,
    DownloadComplete,
    InferenceStart,
    InferenceComplete,
    DetectionStart,
    Fallback,
}

impl ProgressPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DownloadStart => "download_start",
            Self::DownloadComplete => "download_complete",
            Self::InferenceStart => "inference_start",
            Self::InferenceComplete => "inference_complete",
            Self::DetectionStart => "detection_start",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of progress phases. Any `Fn(ProgressPhase)` closure qualifies.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, phase: ProgressPhase);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressPhase) + Send + Sync,
{
    fn emit(&self, phase: ProgressPhase) {
        self(phase)
    }
}

/// Sink for callers that don't render progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _phase: ProgressPhase) {}
}
