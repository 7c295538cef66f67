//! Page translation via the host `Translator`.
//!
//! Order of checks: page text, target language, source detection, same
//! language, availability for the resolved pair. Only then is a session
//! opened.

use super::language::{map_language_to_code, primary_subtag, LanguageDetectionService};
use super::prompts::CONTENT_CLIP;
use super::{require_content, run_single_shot, FailureMessages, ProgressPhase, ProgressSink};
use crate::ai::{
    CapabilityBridge, CapabilityKind, CapabilityStatus, CodedError, ErrorCode, SessionInput,
    SessionOptions,
};
use crate::text::clip_chars;
use serde::Serialize;

const NO_CONTENT: &str = "No readable content found on this page.";
const INVALID_LANGUAGE: &str = "Invalid target language.";
const UNAVAILABLE: &str = "Translation is not available.";
const FAILED: &str = "Failed to translate via Translator API.";
const EMPTY: &str = "Empty translation result.";

/// Language assumed when the source can't be detected.
pub const FALLBACK_SOURCE: &str = "en";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOutcome {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
}

#[derive(Clone)]
pub struct TranslateService {
    bridge: CapabilityBridge,
    detector: LanguageDetectionService,
}

impl TranslateService {
    pub fn new(bridge: CapabilityBridge) -> Self {
        Self {
            detector: LanguageDetectionService::new(bridge.clone()),
            bridge,
        }
    }

    fn pair_options(source: &str, target: &str) -> SessionOptions {
        SessionOptions::new()
            .with("sourceLanguage", source)
            .with("targetLanguage", target)
    }

    /// Availability for a language pair. Labels are mapped to codes first.
    pub async fn check_available(&self, source: &str, target: &str) -> CapabilityStatus {
        let source = map_language_to_code(source);
        let target = map_language_to_code(target);
        self.bridge
            .check_availability(CapabilityKind::Translator, &Self::pair_options(&source, &target))
            .await
    }

    /// Translate `content` into `target_label`. A `source_label` of `None`
    /// or `"auto"` asks the language detector first.
    pub async fn run(
        &self,
        content: &str,
        target_label: &str,
        source_label: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> Result<TranslationOutcome, CodedError> {
        let content = require_content(content, NO_CONTENT)?;

        let target = map_language_to_code(target_label).trim().to_string();
        if target.is_empty() || target == "auto" {
            return Err(CodedError::new(ErrorCode::InvalidLanguage, INVALID_LANGUAGE));
        }

        let source = match source_label.map(map_language_to_code) {
            Some(code) if !code.trim().is_empty() && code != "auto" => code.trim().to_string(),
            _ => self.detect_source(content, progress).await,
        };

        if primary_subtag(&source) == primary_subtag(&target) {
            return Err(CodedError::new(
                ErrorCode::SameLanguage,
                format!("Page is already in {}.", super::language::language_name(&target)),
            ));
        }

        log::info!("[TRANSLATE] {} -> {}", source, target);
        let text = run_single_shot(
            &self.bridge,
            CapabilityKind::Translator,
            &Self::pair_options(&source, &target),
            SessionInput::text(clip_chars(content, CONTENT_CLIP)),
            progress,
            &FailureMessages {
                unavailable: UNAVAILABLE,
                failed: FAILED,
            },
        )
        .await?;

        if text.is_empty() {
            return Err(CodedError::new(ErrorCode::EmptyTranslation, EMPTY));
        }
        Ok(TranslationOutcome {
            text,
            source_language: source,
            target_language: target,
        })
    }

    async fn detect_source(&self, content: &str, progress: &dyn ProgressSink) -> String {
        match self.detector.detect(content, progress).await {
            Ok(found) => found.detected_language,
            Err(e) => {
                log::warn!("[TRANSLATE] Source detection unavailable ({}), assuming English", e);
                progress.emit(ProgressPhase::Fallback);
                FALLBACK_SOURCE.to_string()
            }
        }
    }
}
