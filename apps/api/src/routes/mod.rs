pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Evaluation API
        .route("/api/v1/evaluate", post(handlers::handle_evaluate))
        .route("/api/v1/evaluate/text", post(handlers::handle_evaluate_text))
        .route("/api/v1/rewrite", post(handlers::handle_rewrite))
        .layer(upload_limit)
        .with_state(state)
}
