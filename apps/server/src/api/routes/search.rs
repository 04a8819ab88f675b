//! Search routes, nested under `/api/v1`

use crate::api::handlers::search;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn search_routes() -> Router<AppState> {
    Router::new().route("/search", get(search::simple_search).post(search::search))
}
