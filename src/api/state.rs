//! Application state for the API server

use crate::Orchestrator;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; the orchestrator is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Runs download tasks and owns the progress bus
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Create a new AppState
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}
