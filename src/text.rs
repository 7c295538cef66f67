//! Page text collaborator and clipping helpers.
//!
//! DOM walking lives outside this crate. A `PageTextSource` hands back the
//! visible text of the page with navigation, footers, hidden nodes and the
//! overlay's own elements already stripped.

/// Provider of the current page's readable text.
pub trait PageTextSource: Send + Sync {
    fn extract(&self) -> String;
}

/// Fixed text, for tests and for callers that already hold the content.
#[derive(Debug, Clone, Default)]
pub struct StaticPageText(pub String);

impl StaticPageText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl PageTextSource for StaticPageText {
    fn extract(&self) -> String {
        self.0.clone()
    }
}

/// First `max` characters of `text`, never splitting a code point.
pub fn clip_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracted page text, whitespace-normalized and capped at `limit` chars.
pub fn page_text(source: &dyn PageTextSource, limit: usize) -> String {
    let text = collapse_whitespace(&source.extract());
    clip_chars(&text, limit).to_string()
}
