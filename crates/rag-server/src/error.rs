//! JSON error responses for the HTTP API.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rag_core::RagError;
use serde_json::json;
use tracing::{error, warn};

/// API error with status code and message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, msg: impl Into<String>) -> Self {
        Self { status, code, message: msg.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // `answer` repeats the explanation for clients that only read it.
        let body = json!({
            "answer": format!("Error: {}", self.message),
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let status = match &err {
            RagError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            RagError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            RagError::GeneratorUnconfigured => StatusCode::NOT_IMPLEMENTED,
            RagError::GeneratorUnavailable { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
            RagError::GeneratorUnavailable { .. } | RagError::EmbeddingFailed(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() && !err.is_retryable() && status != StatusCode::NOT_IMPLEMENTED {
            error!(code = err.code(), "request failed: {err}");
        } else {
            warn!(code = err.code(), "request rejected: {err}");
        }
        ApiError::new(status, err.code(), err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), "invalid_request", rejection.body_text())
    }
}
