//! API error type mapped to HTTP status codes.
//!
//! Error responses are plain text. Input validation failures (missing
//! fields, malformed JSON, dimension mismatches) map to 400; store and
//! index failures map to 500. Wrong-method requests get their 405 from
//! the router's method routing.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use contextdb_core::Error as CoreError;

/// Adapter-level error carrying the response status.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request (400).
    BadRequest(String),
    /// Unexpected store or index failure (500).
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, message).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::DimensionMismatch { .. } => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
