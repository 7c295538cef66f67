//! Image analysis via the multimodal `LanguageModel`.
//!
//! Validation (size + MIME) runs before anything touches the bridge.

use super::prompts::image_instruction;
use super::{run_single_shot, FailureMessages, ProgressSink};
use crate::ai::{
    CapabilityBridge, CapabilityKind, CapabilityStatus, CodedError, ErrorCode, ImageInput,
    SessionInput, SessionOptions,
};
use image::ImageReader;
use serde::Serialize;
use serde_json::json;
use std::io::Cursor;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

const TOO_LARGE: &str = "Image size must be less than 10MB";
const BAD_TYPE: &str = "Only JPEG, PNG, GIF, and WebP images are supported";
const UNAVAILABLE: &str = "AI language model not available on this device";
const FAILED: &str = "Failed to analyze image";
/// Returned in place of a blank model reply.
pub const EMPTY_ANALYSIS: &str = "Unable to analyze the image. Please try again.";

pub const SUGGESTIONS: [&str; 8] = [
    "What can you tell me about this image?",
    "Describe the main elements in this photo",
    "What is the mood or atmosphere of this image?",
    "Are there any interesting details or patterns?",
    "Can you identify the location or setting?",
    "What text or words are visible in this image?",
    "Describe the colors and composition",
    "What might be the story behind this image?",
];

pub fn validate_image(image: &ImageInput) -> Result<(), CodedError> {
    if image.size() > MAX_IMAGE_BYTES {
        return Err(CodedError::new(ErrorCode::InvalidImage, TOO_LARGE));
    }
    let mime = image.mime_type.trim().to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(CodedError::new(ErrorCode::InvalidImage, BAD_TYPE));
    }
    Ok(())
}

/// "0 Bytes", "512 Bytes", "1.5 KB", "2 MB". At most two decimals, trailing
/// zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub name: String,
    pub size: String,
    pub mime_type: String,
    /// `(width, height)` when the bytes decode as a known format.
    pub dimensions: Option<(u32, u32)>,
}

pub fn image_metadata(image: &ImageInput) -> ImageMetadata {
    let dimensions = ImageReader::new(Cursor::new(image.bytes.as_slice()))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());
    ImageMetadata {
        name: image.name.clone(),
        size: format_file_size(image.size() as u64),
        mime_type: image.mime_type.clone(),
        dimensions,
    }
}

#[derive(Clone)]
pub struct ImageAnalysisService {
    bridge: CapabilityBridge,
}

impl ImageAnalysisService {
    pub fn new(bridge: CapabilityBridge) -> Self {
        Self { bridge }
    }

    /// Multimodal session: text + image in, English text out.
    pub fn session_options() -> SessionOptions {
        SessionOptions::new()
            .with(
                "expectedInputs",
                json!([{ "type": "text", "languages": ["en"] }, { "type": "image" }]),
            )
            .with("expectedOutputs", json!([{ "type": "text", "languages": ["en"] }]))
    }

    pub async fn check_available(&self) -> CapabilityStatus {
        self.bridge
            .check_availability(CapabilityKind::LanguageModel, &Self::session_options())
            .await
    }

    /// Answer `query` about `image`; a blank query asks for a description.
    pub async fn run(
        &self,
        image: ImageInput,
        query: &str,
        progress: &dyn ProgressSink,
    ) -> Result<String, CodedError> {
        validate_image(&image)?;
        log::info!(
            "[IMAGE] Analyzing {} ({}, {})",
            image.name,
            image.mime_type,
            format_file_size(image.size() as u64)
        );

        let output = run_single_shot(
            &self.bridge,
            CapabilityKind::LanguageModel,
            &Self::session_options(),
            SessionInput::text(image_instruction(query)).with_image(image),
            progress,
            &FailureMessages {
                unavailable: UNAVAILABLE,
                failed: FAILED,
            },
        )
        .await?;

        if output.is_empty() {
            log::warn!("[IMAGE] Model returned an empty analysis");
            return Ok(EMPTY_ANALYSIS.to_string());
        }
        Ok(output)
    }
}
