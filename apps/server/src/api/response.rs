//! Success envelope shared by API handlers.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
