use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::Backend;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Generation backend handed explicitly to each pipeline run. Default: `LlmClient`.
    pub backend: Arc<dyn Backend>,
    pub config: Config,
}
