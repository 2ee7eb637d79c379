pub mod health;

use axum::{routing::get, Router};

use crate::report::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/report/:farm_id/:index", get(handlers::handle_preview))
        .route("/download/:farm_id/:index", get(handlers::handle_download))
        .with_state(state)
}
