//! Floating AI assistant overlay.
//!
//! A floating button and slide-in menu offering summarize, translate,
//! rewrite, chat, templated prompts and image analysis on top of the host
//! browser's on-device models.
//!
//! Layers, leaves first:
//!   - `ai`        capability bridge (direct calls or privileged relay)
//!   - `services`  one single-use-session service per capability
//!   - `overlay`   controller state machine + view contract
//!   - `bootstrap` injection guard and wiring

pub mod ai;
pub mod bootstrap;
pub mod bounded;
pub mod catalog;
pub mod config;
pub mod overlay;
pub mod services;
pub mod text;

pub use bootstrap::{build_overlay, build_relay, init_logging, InjectionGuard, OverlayBootstrapper};
pub use catalog::{MenuCatalog, MenuIntent, MenuItem};
pub use config::OverlayConfig;
pub use overlay::{OverlayController, OverlayState, OverlayView, ViewKind};
