//! API error types and response formatting.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error type that converts to appropriate HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid request parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No images available for the requested set.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal server error (directory scan, manifest parsing, etc.).
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Remote manifest fetch error.
    #[error("manifest fetch error: {0}")]
    Fetch(#[from] reqwest::Error),
}

impl From<randimg_core::Error> for ApiError {
    fn from(err: randimg_core::Error) -> Self {
        match err {
            randimg_core::Error::InvalidType(_) => Self::BadRequest(err.to_string()),
            other => Self::Internal(other.into()),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    success: bool,
    code: u16,
    message: &'static str,
    error: String,
    /// Unix milliseconds.
    timestamp: i64,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Invalid type", msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "No images", msg.clone()),
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    err.to_string(),
                )
            }
            Self::Fetch(err) => {
                tracing::error!(error = %err, "manifest fetch error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    err.to_string(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            code: status.as_u16(),
            message,
            error,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        (status, Json(body)).into_response()
    }
}
