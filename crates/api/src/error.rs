use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use revos_common::RevosError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Request too large")]
    RequestTooLarge,

    #[error("Core service error: {0}")]
    CoreService(#[from] RevosError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
            ApiError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, msg, "AUTHENTICATION_ERROR")
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT"),
            ApiError::RateLimit => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
                "RATE_LIMIT",
            ),
            ApiError::RequestTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request payload too large".to_string(),
                "REQUEST_TOO_LARGE",
            ),
            ApiError::CoreService(err) => core_error_response(err),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        let response_body = json!({
            "success": false,
            "error": error_message,
            "error_code": error_code,
            "timestamp": chrono::Utc::now()
        });

        (status, Json(response_body)).into_response()
    }
}

/// Pipeline failures carry a retry hint for the user; internal detail stays
/// in the logs. Missing records answer 404 whether they never existed or
/// belong to someone else.
fn core_error_response(err: RevosError) -> (StatusCode, String, &'static str) {
    match err {
        RevosError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
        RevosError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
        RevosError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            "Unauthorized".to_string(),
            "UNAUTHORIZED",
        ),
        RevosError::Extraction(msg) => {
            warn!("Extraction failed: {}", msg);
            (
                StatusCode::BAD_GATEWAY,
                "Could not read that syllabus. Please try uploading it again.".to_string(),
                "EXTRACTION_FAILED",
            )
        }
        RevosError::Ingestion(msg) => {
            warn!("Ingestion failed: {}", msg);
            (
                StatusCode::BAD_GATEWAY,
                "The syllabus could not be indexed. Please try uploading it again.".to_string(),
                "INGESTION_FAILED",
            )
        }
        RevosError::Answer(msg) => {
            warn!("Answer generation failed: {}", msg);
            (
                StatusCode::BAD_GATEWAY,
                "Sorry, I couldn't put an answer together. Please try again.".to_string(),
                "ANSWER_FAILED",
            )
        }
        other => {
            error!("Core service error: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "INTERNAL_ERROR",
            )
        }
    }
}

// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
