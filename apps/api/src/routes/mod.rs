pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers as jobs;
use crate::state::AppState;
use crate::style::handlers as style;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Style preview
        .route("/api/v1/style/route", post(style::handle_route_preview))
        // Job postings
        .route("/api/v1/jobs/generate", post(jobs::handle_generate))
        .route("/api/v1/jobs/feedback", post(jobs::handle_feedback))
        .route("/api/v1/jobs/:id", get(jobs::handle_get_generation))
        .with_state(state)
}
