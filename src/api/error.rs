//! API error types with structured JSON responses.
//!
//! Two hard rules live here. Auth failures are uniform: one status, one
//! code, one message, regardless of why the tenant was rejected. And
//! internal errors never leak detail: the client gets a reference id
//! while the detail (with filesystem paths scrubbed) goes to the log.

use std::sync::LazyLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::extraction::ExtractionError;
use crate::tenant::GuardError;
use crate::worker::WorkerError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Tenant not recognised")]
    Unauthorized,
    #[error("Access denied")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
    #[error("Unprocessable: {0}")]
    Unprocessable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

static PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // Absolute unix paths under the usual roots. Compile-time constant.
    #[allow(clippy::unwrap_used)]
    Regex::new(r"/(?:home|Users|root|var|tmp|etc)/[^\s'\x22]+").unwrap()
});

/// Replace filesystem paths in outbound text.
fn scrub_paths(text: &str) -> String {
    PATH_PATTERN.replace_all(text, "[path]").to_string()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "TENANT_UNAUTHORIZED",
                "Tenant not recognised".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::PayloadTooLarge(detail) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                detail.clone(),
            ),
            ApiError::UnsupportedMedia(detail) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA",
                detail.clone(),
            ),
            ApiError::Unprocessable(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE",
                detail.clone(),
            ),
            ApiError::Internal(detail) => {
                let trace_id = Uuid::new_v4();
                tracing::error!(%trace_id, detail = %scrub_paths(detail), "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    format!("An unexpected error occurred (ref {trace_id})"),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message: scrub_paths(&message),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<GuardError> for ApiError {
    fn from(_: GuardError) -> Self {
        ApiError::Unauthorized
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match &err {
            ExtractionError::UnsupportedType(_) => ApiError::UnsupportedMedia(err.to_string()),
            ExtractionError::EmptyInput => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Unprocessable(err.to_string()),
        }
    }
}
