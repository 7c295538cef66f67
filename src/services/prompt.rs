//! Templated prompts via the host `LanguageModel`, plus the recent-usage
//! cache the prompt view lists above the catalog.

use super::{require_content, run_single_shot, FailureMessages, ProgressSink};
use crate::ai::{CapabilityBridge, CapabilityKind, CapabilityStatus, CodedError, SessionInput, SessionOptions};
use crate::bounded::BoundedQueue;
use crate::text::{clip_chars, collapse_whitespace};
use chrono::{DateTime, Utc};
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const NO_CONTENT: &str = "No input provided for the prompt.";
const UNAVAILABLE: &str = "Prompt API is not available.";
const FAILED: &str = "Prompt execution failed.";
const SNIPPET_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    pub label: String,
    pub description: String,
    /// Body with an `{{input}}` placeholder.
    pub template: String,
}

impl PromptTemplate {
    fn new(id: &str, label: &str, description: &str, template: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            description: description.to_string(),
            template: template.to_string(),
        }
    }
}

pub fn default_templates() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate::new(
            "summarize-highlight",
            "Summarize selection",
            "Turn highlighted text into key bullet points.",
            "Summarize the following content into 4 concise bullet points with short phrases. Avoid repetition.\n\nCONTENT:\n{{input}}",
        ),
        PromptTemplate::new(
            "explain-like-five",
            "Explain simply",
            "Explain this like I am new to the topic.",
            "Explain the following content in simple terms suitable for a beginner. Use short paragraphs and avoid jargon.\n\nCONTENT:\n{{input}}",
        ),
        PromptTemplate::new(
            "draft-email",
            "Draft email reply",
            "Write a polite email based on context.",
            "Write a polite and professional email reply based on the following context. Keep it under 180 words.\n\nCONTEXT:\n{{input}}",
        ),
        PromptTemplate::new(
            "action-items",
            "Action items",
            "Extract tasks from the text.",
            "Read the following content and extract the actionable next steps as a bullet list.\n\nCONTENT:\n{{input}}",
        ),
    ]
}

pub fn find_template(id: &str) -> Option<PromptTemplate> {
    default_templates().into_iter().find(|t| t.id == id)
}

fn placeholder() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)\{\{input\}\}").ok())
        .as_ref()
}

/// Substitute every `{{input}}` (any case) with `input`, literally.
pub fn build_prompt(template: &str, input: &str) -> String {
    match placeholder() {
        Some(re) => re.replace_all(template, NoExpand(input)).into_owned(),
        None => template.replace("{{input}}", input),
    }
}

// ── Recent usage ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPrompt {
    pub id: String,
    pub template_id: String,
    pub label: String,
    /// Input snippet, or the template description when the input was blank.
    pub description: String,
    pub template: String,
    pub input: String,
    pub used_at: DateTime<Utc>,
}

impl RecentPrompt {
    pub fn new(template: &PromptTemplate, input: &str) -> Self {
        let used_at = Utc::now();
        let input = input.trim().to_string();
        let snippet = collapse_whitespace(clip_chars(&input, SNIPPET_CHARS));
        Self {
            id: format!("{}-{}", template.id, used_at.timestamp_millis()),
            template_id: template.id.clone(),
            label: template.label.clone(),
            description: if snippet.is_empty() {
                template.description.clone()
            } else {
                snippet
            },
            template: template.template.clone(),
            input,
            used_at,
        }
    }
}

/// Most-recent-first cache of template runs.
#[derive(Debug, Clone)]
pub struct RecentPrompts {
    entries: BoundedQueue<RecentPrompt>,
}

impl RecentPrompts {
    pub const DEFAULT_LIMIT: usize = 5;

    pub fn new(limit: usize) -> Self {
        Self {
            entries: BoundedQueue::new(limit),
        }
    }

    pub fn record(&mut self, template: &PromptTemplate, input: &str) {
        let entry = RecentPrompt::new(template, input);
        log::debug!("[PROMPT] Recent usage recorded: {}", entry.id);
        self.entries.push_front(entry);
    }

    pub fn entries(&self) -> Vec<RecentPrompt> {
        self.entries.to_vec()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RecentPrompts {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}

// ── Service ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PromptService {
    bridge: CapabilityBridge,
}

impl PromptService {
    pub fn new(bridge: CapabilityBridge) -> Self {
        Self { bridge }
    }

    pub fn session_options(shared_context: Option<&str>) -> SessionOptions {
        SessionOptions::new()
            .with("topK", 1)
            .with("temperature", 0.2)
            .with("systemPrompt", shared_context.unwrap_or_default())
            .with("language", "en")
    }

    pub async fn check_available(&self) -> CapabilityStatus {
        self.bridge
            .check_availability(CapabilityKind::LanguageModel, &SessionOptions::new())
            .await
    }

    /// Fill `template` with `input` and run it. A blank reply comes back as
    /// an empty string; the prompt view words that itself.
    pub async fn run(
        &self,
        template: &str,
        input: &str,
        shared_context: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> Result<String, CodedError> {
        let input = require_content(input, NO_CONTENT)?;
        let prompt = build_prompt(template, input);
        log::info!("[PROMPT] Sending {} chars", prompt.chars().count());

        run_single_shot(
            &self.bridge,
            CapabilityKind::LanguageModel,
            &Self::session_options(shared_context),
            SessionInput::text(prompt),
            progress,
            &FailureMessages {
                unavailable: UNAVAILABLE,
                failed: FAILED,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_case_insensitive_and_literal() {
        assert_eq!(build_prompt("A {{input}} / {{INPUT}}", "x"), "A x / x");
        assert_eq!(build_prompt("Q: {{input}}", "$1 and ${2}"), "Q: $1 and ${2}");
    }

    #[test]
    fn recent_cache_is_mru_and_bounded() {
        let templates = default_templates();
        let mut recent = RecentPrompts::default();
        for i in 0..6 {
            recent.record(&templates[i % templates.len()], &format!("input {}", i));
        }
        let entries = recent.entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].input, "input 5");
        assert_eq!(entries[4].input, "input 1");
    }

    #[test]
    fn snippet_is_collapsed_and_clipped() {
        let template = find_template("draft-email").unwrap();
        let entry = RecentPrompt::new(&template, &format!("  line one\n\nline   two {}", "z".repeat(300)));
        assert!(entry.description.starts_with("line one line two"));
        assert!(entry.description.chars().count() <= SNIPPET_CHARS);
        assert!(entry.id.starts_with("draft-email-"));

        let blank = RecentPrompt::new(&template, "   ");
        assert_eq!(blank.description, template.description);
    }
}
