//! Language tables and detection.

use super::{open_session, ProgressPhase, ProgressSink};
use crate::ai::{
    CapabilityBridge, CapabilityKind, CapabilityStatus, CodedError, ErrorCode, SessionInput,
    SessionOptions,
};
use serde::{Deserialize, Serialize};

/// Targets offered in the translation picker: (code, label).
pub const LANGUAGES: [(&str, &str); 12] = [
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("pt", "Portuguese"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese (Simplified)"),
    ("hi", "Hindi"),
    ("ar", "Arabic"),
    ("ru", "Russian"),
];

/// Human-readable name for a BCP 47 code. Unknown codes come back upper-cased.
pub fn language_name(code: &str) -> String {
    let name = match code {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "zh" => "Chinese",
        "zh-CN" => "Chinese (Simplified)",
        "zh-TW" => "Chinese (Traditional)",
        "ja" => "Japanese",
        "ko" => "Korean",
        "ru" => "Russian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "nl" => "Dutch",
        "pl" => "Polish",
        "tr" => "Turkish",
        "sv" => "Swedish",
        "da" => "Danish",
        "no" => "Norwegian",
        "fi" => "Finnish",
        "el" => "Greek",
        "he" => "Hebrew",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        "ms" => "Malay",
        "tl" => "Filipino",
        "ur" => "Urdu",
        "bn" => "Bengali",
        "ta" => "Tamil",
        "te" => "Telugu",
        "mr" => "Marathi",
        "gu" => "Gujarati",
        "kn" => "Kannada",
        "ml" => "Malayalam",
        "pa" => "Punjabi",
        "or" => "Odia",
        "as" => "Assamese",
        other => return other.to_uppercase(),
    };
    name.to_string()
}

/// Map a language label (English or native name) to its code.
/// Anything not in the table, codes included, is returned as given.
pub fn map_language_to_code(label: &str) -> String {
    let code = match label.trim().to_lowercase().as_str() {
        "spanish" | "español" => "es",
        "french" | "français" => "fr",
        "german" | "deutsch" => "de",
        "italian" | "italiano" => "it",
        "portuguese" | "português" => "pt",
        "chinese" | "中文" => "zh",
        "japanese" | "日本語" => "ja",
        "korean" | "한국어" => "ko",
        "russian" | "русский" => "ru",
        "arabic" | "العربية" => "ar",
        "hindi" | "हिन्दी" => "hi",
        "english" => "en",
        "auto" => "auto",
        _ => return label.to_string(),
    };
    code.to_string()
}

/// `"en-US"` → `"en"`, lower-cased.
pub fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

// ── Detection ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLanguage {
    pub detected_language: String,
    #[serde(default)]
    pub confidence: f64,
}

const DETECT_NO_CONTENT: &str = "Invalid text for language detection";
const DETECT_UNAVAILABLE: &str = "Language detection is not available";
const DETECT_FAILED: &str = "Failed to detect language";

#[derive(Clone)]
pub struct LanguageDetectionService {
    bridge: CapabilityBridge,
}

impl LanguageDetectionService {
    pub fn new(bridge: CapabilityBridge) -> Self {
        Self { bridge }
    }

    pub async fn check_available(&self) -> CapabilityStatus {
        self.bridge
            .check_availability(CapabilityKind::LanguageDetector, &SessionOptions::new())
            .await
    }

    /// Most likely language of `text`.
    pub async fn detect(
        &self,
        text: &str,
        progress: &dyn ProgressSink,
    ) -> Result<DetectedLanguage, CodedError> {
        let text = super::require_content(text, DETECT_NO_CONTENT)?;
        let options = SessionOptions::new();
        let status = super::require_available(
            &self.bridge,
            CapabilityKind::LanguageDetector,
            &options,
            DETECT_UNAVAILABLE,
        )
        .await?;
        let mut session = open_session(
            &self.bridge,
            CapabilityKind::LanguageDetector,
            status,
            &options,
            progress,
            DETECT_FAILED,
        )
        .await?;

        progress.emit(ProgressPhase::DetectionStart);
        let reply = session
            .invoke(SessionInput::text(text))
            .await
            .map_err(|e| CodedError::inference_failed(DETECT_FAILED, e))?;

        let top = parse_detection(&reply)
            .ok_or_else(|| CodedError::new(ErrorCode::InferenceFailed, DETECT_FAILED))?;
        log::info!(
            "[TRANSLATE] Detected {} (confidence {:.2})",
            top.detected_language,
            top.confidence
        );
        Ok(top)
    }
}

/// Top entry of a detector reply: a JSON list ordered by confidence.
pub fn parse_detection(reply: &str) -> Option<DetectedLanguage> {
    let results: Vec<DetectedLanguage> = serde_json::from_str(reply.trim()).ok()?;
    results
        .into_iter()
        .find(|r| !r.detected_language.trim().is_empty())
}
