//! Instruction text sent to the on-device models.
//!
//! Builders are pure: same input, same text. Services call them after the
//! availability gate and before `inference_start`.

use crate::text::clip_chars;

/// Characters of page text a summary or translation request carries.
pub const CONTENT_CLIP: usize = 8000;
/// Characters of page text embedded in a chat turn.
pub const CHAT_CONTEXT_CLIP: usize = 3000;
/// Characters of page text used to suggest questions.
pub const SUGGESTION_CONTEXT_CLIP: usize = 2000;

// ── Summarize ───────────────────────────────────────────────────────

pub fn summarize_instruction(content: &str) -> String {
    format!(
        "You are a careful summarizer. Return ONLY 4-6 bullet points, each prefixed with \"- \". \
         Paraphrase; do not copy verbatim. Keep the total under 1200 characters.\n\nCONTENT:\n{}",
        clip_chars(content, CONTENT_CLIP)
    )
}

// ── Chat ────────────────────────────────────────────────────────────

const CHAT_FORMATTING: &str = "Please provide a helpful, conversational response based on the page content and the user's question. Use markdown formatting for better readability:
- Use **bold** for emphasis
- Use *italic* for subtle emphasis
- Use headers (# ## ###) for organization
- Use bullet points (*) for lists
- Use `code` for technical terms
- Use blockquotes (> ) for quotes

Be natural and friendly while formatting your response for clarity.";

/// One chat turn rendered into the prompt, oldest first.
pub fn chat_instruction<'a, I>(history: I, page_content: &str, message: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut prompt = String::new();
    let mut turns = history.into_iter().peekable();
    if turns.peek().is_some() {
        prompt.push_str("Previous conversation:\n");
        for (role, content) in turns {
            prompt.push_str(role);
            prompt.push_str(": ");
            prompt.push_str(content);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    let context = if page_content.trim().is_empty() {
        "No content available"
    } else {
        clip_chars(page_content, CHAT_CONTEXT_CLIP)
    };
    prompt.push_str(&format!(
        "You are a helpful AI assistant. The user is currently viewing a web page with the following content:\n\n\
         Page Content: {}\n\nUser's Question: {}\n\n{}",
        context, message, CHAT_FORMATTING
    ));
    prompt
}

pub fn suggested_questions_instruction(page_content: &str) -> String {
    format!(
        "Based on the following page content, suggest 4-5 relevant questions the user might want to ask \
         about this content. Make them specific and helpful. Return as a JSON array of strings.\n\n\
         Content: {}\n\n\
         Example format: [\"What is the main topic?\", \"How does this work?\", \"What are the key benefits?\"]",
        clip_chars(page_content, SUGGESTION_CONTEXT_CLIP)
    )
}

// ── Image ───────────────────────────────────────────────────────────

pub const DEFAULT_IMAGE_QUERY: &str = "Describe what you see in this image in detail.";

pub fn image_instruction(query: &str) -> String {
    let query = if query.trim().is_empty() {
        DEFAULT_IMAGE_QUERY
    } else {
        query.trim()
    };
    format!(
        "You are an AI vision assistant. Please analyze the uploaded image and respond to the user's query.

{}

Provide a comprehensive analysis including:
1. Main objects and elements visible
2. Colors, composition, and visual details
3. Setting or context if identifiable
4. Any text or writing in the image
5. Notable features or points of interest

Format your response using markdown for better readability:
- Use **bold** for emphasis
- Use headers (# ## ###) for organization
- Use bullet points (*) for lists
- Use `code` for technical terms",
        query
    )
}
