//! Runtime configuration.
//!
//! Defaults match the shipped extension. `from_env` lets a host (or a test
//! harness) override them through `OVERLAY_*` variables, optionally kept
//! in `.env.local` / `.env` next to the working directory.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_RELAY_TIMEOUT_MS: &str = "OVERLAY_RELAY_TIMEOUT_MS";
pub const ENV_SESSION_TIMEOUT_MS: &str = "OVERLAY_SESSION_TIMEOUT_MS";
pub const ENV_PAGE_TEXT_LIMIT: &str = "OVERLAY_PAGE_TEXT_LIMIT";
pub const ENV_CHAT_HISTORY_LIMIT: &str = "OVERLAY_CHAT_HISTORY_LIMIT";
pub const ENV_RECENT_PROMPT_LIMIT: &str = "OVERLAY_RECENT_PROMPT_LIMIT";
pub const ENV_INJECTION_FLAG: &str = "OVERLAY_INJECTION_FLAG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Upper bound on availability checks and host injection over the relay.
    pub relay_timeout: Duration,
    /// Deadline for relayed session creation and prompts. `None` waits as
    /// long as the model takes; creation may include a model download.
    pub session_timeout: Option<Duration>,
    /// Characters of page text handed to services before their own clip.
    pub page_text_limit: usize,
    pub chat_history_limit: usize,
    pub recent_prompt_limit: usize,
    /// Marker set on the document root once the overlay is mounted.
    pub injection_flag: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            relay_timeout: Duration::from_millis(5000),
            session_timeout: None,
            page_text_limit: 20_000,
            chat_history_limit: 10,
            recent_prompt_limit: 5,
            injection_flag: "chromeAiFabInjected".to_string(),
        }
    }
}

impl OverlayConfig {
    /// Load `.env.local` → `.env` (first one found) from `dir`, then read
    /// overrides from the process environment.
    pub fn from_env_in(dir: &Path) -> Self {
        for env_file in [".env.local", ".env"] {
            let path = dir.join(env_file);
            if path.exists() {
                match dotenvy::from_path(&path) {
                    Ok(_) => log::info!("[CONFIG] Loaded {}", path.display()),
                    Err(e) => log::warn!("[CONFIG] Failed to load {}: {}", path.display(), e),
                }
                break;
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`OverlayConfig::from_env_in`] for the current directory.
    pub fn from_env() -> Self {
        Self::from_env_in(Path::new("."))
    }

    /// Build from an arbitrary key lookup. Unset keys keep their default;
    /// unparseable values keep it too, with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let relay_ms = parse_or(&lookup, ENV_RELAY_TIMEOUT_MS, defaults.relay_timeout.as_millis() as u64);
        // 0 means no deadline
        let session_ms = parse_or(&lookup, ENV_SESSION_TIMEOUT_MS, 0u64);
        let injection_flag = lookup(ENV_INJECTION_FLAG)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.injection_flag);

        Self {
            relay_timeout: Duration::from_millis(relay_ms),
            session_timeout: (session_ms > 0).then(|| Duration::from_millis(session_ms)),
            page_text_limit: parse_or(&lookup, ENV_PAGE_TEXT_LIMIT, defaults.page_text_limit),
            chat_history_limit: parse_or(&lookup, ENV_CHAT_HISTORY_LIMIT, defaults.chat_history_limit),
            recent_prompt_limit: parse_or(&lookup, ENV_RECENT_PROMPT_LIMIT, defaults.recent_prompt_limit),
            injection_flag,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("[CONFIG] Ignoring {}={:?}: not a valid number", key, raw);
                default
            }
        },
    }
}
