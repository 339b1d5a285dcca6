//! HTTP error mapping
//!
//! Every library error kind maps to its own status code; the body is
//! `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kvt_common::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Library error, mapped by its kind
    #[error(transparent)]
    Library(#[from] kvt_common::Error),

    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Bad credentials or token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "AUTH_FAILED"),
            ApiError::Library(err) => match err.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
                ErrorKind::Auth => (StatusCode::UNAUTHORIZED, "AUTH_FAILED"),
                ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
                ErrorKind::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
                ErrorKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE"),
                ErrorKind::Config => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
                ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
