//! Response shaping.
//!
//! # Responsibilities
//! - Keep every response JSON, errors included
//! - Map handler failures to appropriate HTTP status codes
//!
//! # Design Decisions
//! - Error bodies share one envelope: status, code, message
//! - Handler errors surface their message and nothing else

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// JSON envelope for non-2xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub code: u16,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            code: code.as_u16(),
            message: message.into(),
        }
    }
}

/// Build the standard JSON error response for `code`.
pub fn error_response(code: StatusCode, message: impl Into<String>) -> Response {
    (code, Json(ErrorBody::new(code, message))).into_response()
}

/// Failure inside a handler that should surface as JSON, not a panic.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Unexpected internal state.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Handler failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
    }
}
