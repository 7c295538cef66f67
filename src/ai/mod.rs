//! Capability bridge module.
//!
//! - `types`      kinds, statuses, options and inputs shared with the host
//! - `error`      `BridgeError` and the coded service error taxonomy
//! - `capability` `Capability` / `AiSession` traits and the registry
//! - `session`    scoped session ownership
//! - `transport`  transport seam + in-context transport
//! - `host`       page-world RPC (host and client halves)
//! - `relay`      privileged relay protocol, broker and relay transport
//! - `bridge`     direct-vs-relay selection

pub mod bridge;
pub mod capability;
pub mod error;
pub mod host;
pub mod relay;
pub mod session;
pub mod transport;
pub mod types;

pub use bridge::CapabilityBridge;
pub use capability::{AiSession, Capability, CapabilityRegistry, ChunkStream};
pub use error::{BridgeError, CodedError, ErrorCode};
pub use session::SessionGuard;
pub use transport::{CapabilityTransport, DirectTransport};
pub use types::{CapabilityKind, CapabilityStatus, ImageInput, SessionInput, SessionOptions};
