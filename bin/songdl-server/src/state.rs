//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use songdl_core::Orchestrator;

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Download orchestration, including the artifact janitor.
    pub orchestrator: Arc<Orchestrator>,
}
