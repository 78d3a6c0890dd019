pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::poster::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/templates", get(handlers::handle_list_templates))
        .route("/api/v1/posters", post(handlers::handle_compose_poster))
        .route("/api/v1/posters/plan", post(handlers::handle_plan_poster))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload))
        .with_state(state)
}
