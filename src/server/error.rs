//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<T, AppError>`; store errors convert with `?` and
//! are rendered as `{"error": ..., "code": ...}` JSON with the status from
//! [`Error::http_status`].

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use imgshelf_common::Error;
use serde_json::json;

/// Message returned in place of any 5xx error detail.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

/// Error returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A store failure.
    #[error(transparent)]
    Store(#[from] Error),
    /// A malformed request rejected before reaching the store.
    #[error("{message}")]
    BadRequest {
        status: StatusCode,
        message: String,
    },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(e) => {
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::BadRequest { status, .. } => *status,
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, code) = match &self {
            Self::Store(inner) if status.is_server_error() => {
                tracing::error!(status = %status, error = %inner, "Server error in API handler");
                (INTERNAL_ERROR_MESSAGE.to_string(), inner.code())
            }
            Self::Store(inner) => (inner.to_string(), inner.code()),
            Self::BadRequest { message, .. } => (message.clone(), "bad_request"),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
