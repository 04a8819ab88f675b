//! Error types for the search service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Database(_) | Error::Internal(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::InvalidFilter(_) => "INVALID_FILTER",
            Error::Unauthorized(_) => "UNAUTHORIZED",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Timeout(_) => "TIMEOUT",
            Error::Database(_) | Error::Internal(_) | Error::Other(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Error::Database(_) | Error::Internal(_) | Error::Other(_) => {
                tracing::error!("Internal error: {}", self);
                "Internal server error".to_string()
            }
            Error::Timeout(_) => {
                tracing::warn!("Request timed out: {}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let err = Error::Validation("limit must be positive".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "Validation error: limit must be positive");
    }

    #[test]
    fn internal_errors_map_to_500() {
        let err = Error::Other(anyhow::anyhow!("boom"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(Error::Timeout("search".into()).status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
