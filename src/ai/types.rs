//! Capability types shared by the bridge, the relay and the services.
//!
//! Wire-facing types serialize to the same JSON the host AI APIs and the
//! relay messages use, so options built here pass through untouched.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One on-device AI function exposed by the host browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityKind {
    Summarizer,
    Translator,
    Rewriter,
    LanguageModel,
    LanguageDetector,
}

impl CapabilityKind {
    /// Name of the global the host exposes for this capability.
    pub fn host_name(&self) -> &'static str {
        match self {
            Self::Summarizer => "Summarizer",
            Self::Translator => "Translator",
            Self::Rewriter => "Rewriter",
            Self::LanguageModel => "LanguageModel",
            Self::LanguageDetector => "LanguageDetector",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.host_name())
    }
}

/// Result of an availability probe.
///
/// Older host builds answer `no` / `readily` / `after-download`; newer ones
/// `unavailable` / `available` / `downloadable`. Both spellings deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityStatus {
    #[serde(alias = "no")]
    Unavailable,
    #[serde(alias = "after-download", alias = "downloading")]
    Downloadable,
    #[serde(alias = "readily", alias = "available")]
    Ready,
}

impl CapabilityStatus {
    /// Normalize a raw host availability string.
    pub fn from_host(raw: &str) -> Self {
        match raw.trim() {
            "" | "no" | "unavailable" => Self::Unavailable,
            "readily" | "available" | "ready" => Self::Ready,
            _ => Self::Downloadable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Downloadable => "downloadable",
            Self::Ready => "ready",
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

impl fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability-specific construction / probe options, passed to the host verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionOptions(Map<String, Value>);

impl SessionOptions {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Accepts any JSON object; other values become empty options.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self(map.clone()),
            _ => Self::new(),
        }
    }
}

/// An image handed to a multimodal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Serialize for the page-world RPC (base64 payload).
    pub fn to_wire(&self) -> WireImage {
        WireImage {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(&self.bytes),
        }
    }
}

/// JSON form of [`ImageInput`] crossing the page-world boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireImage {
    pub name: String,
    pub mime_type: String,
    pub data: String,
}

impl WireImage {
    pub fn decode(&self) -> Result<ImageInput, base64::DecodeError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(self.data.as_bytes())?;
        Ok(ImageInput::new(self.name.clone(), self.mime_type.clone(), bytes))
    }
}

/// What a session is asked to process in one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInput {
    pub text: String,
    /// Per-call request options (e.g. rewrite tone/length/context).
    pub options: SessionOptions,
    pub image: Option<ImageInput>,
}

impl SessionInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }
}
