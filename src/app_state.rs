//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::EventStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read access to persisted events.
    pub store: Arc<dyn EventStore>,
}

impl AppState {
    /// Creates the state around a shared store handle.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }
}
