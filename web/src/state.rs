//! Application state for Axum handlers.

use atelier_core::{ContentStore, Coordinator};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cheap to clone: the coordinator and the store are reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Checkout and reconciliation service
    pub coordinator: Coordinator,
    /// Catalog reads and readiness probes
    pub store: Arc<dyn ContentStore>,
}

impl AppState {
    /// State whose catalog endpoints read the coordinator's own store.
    #[must_use]
    pub fn new(coordinator: Coordinator) -> Self {
        let store = Arc::clone(coordinator.store());
        Self { coordinator, store }
    }
}
