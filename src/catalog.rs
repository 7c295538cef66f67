//! Menu catalog and the intents its items raise.

use crate::overlay::view::ViewKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Action requested from the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuIntent {
    Summary,
    Translate,
    Chat,
    Rewrite,
    Prompt,
    Image,
}

impl MenuIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Translate => "translate",
            Self::Chat => "chat",
            Self::Rewrite => "rewrite",
            Self::Prompt => "prompt",
            Self::Image => "image",
        }
    }

    /// View the controller moves to for this intent.
    pub fn view(&self) -> ViewKind {
        match self {
            Self::Summary => ViewKind::Summary,
            Self::Translate => ViewKind::Translation,
            Self::Chat => ViewKind::Chat,
            Self::Rewrite => ViewKind::Rewrite,
            Self::Prompt => ViewKind::Prompt,
            Self::Image => ViewKind::Image,
        }
    }
}

impl fmt::Display for MenuIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MenuIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "summary" => Ok(Self::Summary),
            "translate" => Ok(Self::Translate),
            "chat" => Ok(Self::Chat),
            "rewrite" => Ok(Self::Rewrite),
            "prompt" => Ok(Self::Prompt),
            "image" => Ok(Self::Image),
            other => Err(format!("unknown menu item: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    pub description: String,
}

impl MenuItem {
    pub fn new(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn intent(&self) -> Option<MenuIntent> {
        self.id.parse().ok()
    }
}

fn default_items() -> Vec<MenuItem> {
    vec![
        MenuItem::new("summary", "Summarize Page", "Get a concise overview of what you are reading."),
        MenuItem::new("chat", "Open Chat", "Start a conversation with the assistant."),
        MenuItem::new("rewrite", "Improve Writing", "Refine tone or length of selected text."),
        MenuItem::new("prompt", "Prompt Quick Actions", "Fire off templated AI prompts for common tasks."),
        MenuItem::new("image", "Analyze Image", "Upload an image for AI analysis and description."),
    ]
}

/// Items shown in the menu. A translate entry is always present.
#[derive(Debug, Clone)]
pub struct MenuCatalog {
    items: Vec<MenuItem>,
}

impl MenuCatalog {
    pub fn new(source: Option<Vec<MenuItem>>) -> Self {
        let mut items = source.unwrap_or_else(default_items);
        if !items.iter().any(|i| i.id == "translate") {
            items.push(MenuItem::new(
                "translate",
                "Translate Page",
                "Translate this page into another language.",
            ));
        }
        Self { items }
    }

    pub fn load_items(&self) -> Vec<MenuItem> {
        self.items.clone()
    }
}

impl Default for MenuCatalog {
    fn default() -> Self {
        Self::new(None)
    }
}
