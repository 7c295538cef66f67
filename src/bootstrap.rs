//! Mounting the overlay: logging, the double-injection guard and wiring
//! bridge → services → controller.

use crate::ai::host::{self, PageHost};
use crate::ai::relay::{MainWorld, RelayTransport, ServiceWorker, TabId};
use crate::ai::{CapabilityBridge, CapabilityRegistry, CapabilityTransport, DirectTransport};
use crate::catalog::MenuCatalog;
use crate::config::OverlayConfig;
use crate::overlay::{OverlayController, OverlayServices, OverlayView};
use crate::text::PageTextSource;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Install `env_logger` (default level `info`, `RUST_LOG` overrides).
/// Later calls do nothing.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::info!("[BOOTSTRAP] Logging initialized");
    }
}

/// Remembers which document roots already carry the overlay.
pub struct InjectionGuard {
    flag: String,
    marked: Mutex<HashSet<String>>,
}

impl InjectionGuard {
    pub fn new(flag: impl Into<String>) -> Self {
        Self {
            flag: flag.into(),
            marked: Mutex::new(HashSet::new()),
        }
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn mark_initialised(&self, root: &str) {
        self.marked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(root.to_string());
    }

    pub fn is_initialised(&self, root: &str) -> bool {
        self.marked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(root)
    }
}

impl Default for InjectionGuard {
    fn default() -> Self {
        Self::new(OverlayConfig::default().injection_flag)
    }
}

pub struct OverlayBootstrapper {
    guard: Arc<InjectionGuard>,
}

impl OverlayBootstrapper {
    pub fn new(guard: Arc<InjectionGuard>) -> Self {
        Self { guard }
    }

    /// Build and initialize an overlay for `root` unless one is already
    /// mounted there. `build` only runs on the first call per root.
    pub fn run<F>(&self, root: &str, build: F) -> Option<OverlayController>
    where
        F: FnOnce() -> OverlayController,
    {
        if self.guard.is_initialised(root) {
            log::info!("[BOOTSTRAP] {} already carries {}, skipping", root, self.guard.flag());
            return None;
        }
        let controller = build();
        controller.initialize();
        self.guard.mark_initialised(root);
        log::info!("[BOOTSTRAP] Overlay mounted on {}", root);
        Some(controller)
    }
}

/// Relay into a main world that exposes `main_world`: a service-worker
/// broker for probes plus a page host for sessions. Needs a tokio runtime.
pub fn build_relay(
    main_world: CapabilityRegistry,
    sender_tab: Option<TabId>,
    config: &OverlayConfig,
) -> RelayTransport {
    let executor = Arc::new(MainWorld::new(main_world.clone()));
    let broker = Arc::new(ServiceWorker::new(sender_tab, executor));
    let client = host::connect(
        Arc::new(PageHost::new(main_world)),
        config.relay_timeout,
        config.session_timeout,
    );
    RelayTransport::new(broker, client, config.relay_timeout)
}

/// Wire an overlay. `registry` holds the capabilities reachable in the
/// calling context; `relay` serves the rest.
pub fn build_overlay(
    registry: CapabilityRegistry,
    relay: Option<Arc<dyn CapabilityTransport>>,
    view: Arc<dyn OverlayView>,
    page: Arc<dyn PageTextSource>,
    config: OverlayConfig,
) -> OverlayController {
    let mut bridge = CapabilityBridge::new(Arc::new(DirectTransport::new(registry)));
    if let Some(relay) = relay {
        bridge = bridge.with_relay(relay);
    }
    OverlayController::new(
        view,
        page,
        OverlayServices::new(bridge),
        MenuCatalog::default(),
        config,
    )
}
