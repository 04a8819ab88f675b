//! API layer - routes, handlers, and middleware

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    Router::new()
        .route("/health", get(health_check))
        .merge(routes::metrics::metrics_routes())
        .nest("/api/v1", routes::search::search_routes())
        .with_state(state)
        // Applied in reverse order
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        .layer(middleware::trace())
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "folio-server"
    }))
}
