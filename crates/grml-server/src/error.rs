//! Error types with HTTP status code mapping.
//!
//! [`ApiError`] implements `axum::response::IntoResponse` and produces a
//! `{"success": false, "error": {code, message}}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::hub::ClientId;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ApiErrorDetail,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 404
    #[error("not found: {0}")]
    NotFound(String),

    /// 400
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 500
    #[error("internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::InternalError(msg) => {
                tracing::error!(%msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };
        let body = ErrorBody {
            success: false,
            error: ApiErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Relay-side failures.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("client {client} is not connected")]
    UnknownClient { client: ClientId },

    #[error("invalid value '{value}' for {key}")]
    Config { key: String, value: String },
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::UnknownClient { .. } => ApiError::NotFound(err.to_string()),
            RelayError::Config { .. } => ApiError::InternalError(err.to_string()),
        }
    }
}
