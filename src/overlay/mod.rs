//! Overlay controller and the contract it drives its view through.

pub mod controller;
pub mod history;
pub mod messages;
pub mod view;

pub use controller::{OverlayController, OverlayServices, OverlayState};
pub use history::ChatHistory;
pub use view::{OverlayView, ViewKind};
