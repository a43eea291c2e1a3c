pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::errors::AppError;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/keywords/extract",
            post(handlers::handle_extract_keywords),
        )
        .route("/api/v1/analyze", post(handlers::handle_analyze))
        .fallback(not_found)
        .with_state(state)
}
