pub mod health;
pub mod webhook;

use axum::{
    routing::{get, post},
    Router,
};

use crate::search::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Search API
        .route("/api/v1/search-jobs", post(handlers::handle_search_jobs))
        .route("/api/v1/providers", get(handlers::handle_list_providers))
        // Ingest
        .route("/webhook/new-job", post(webhook::handle_new_job))
        .with_state(state)
}
