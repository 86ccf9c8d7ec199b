//! Domain error types for the growth-report pipeline.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Caller-side missing input (no student selected, no payload attached).
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Required form field missing or malformed. The message names the fields.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// AI provider call failed or returned an error status.
    #[error("Processing failed: {0}")]
    Processing(String),

    /// Transcription poll loop exceeded its attempt bound.
    #[error("Processing timed out: {0}")]
    Timeout(String),

    /// Provider responded but the payload was unusable.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Report generation provider call failed.
    #[error("Report generation failed: {0}")]
    Generation(String),

    /// Store write failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Store write failed after a prior related write succeeded.
    #[error("Partial persistence: {0}")]
    PartialPersistence(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed for this resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Storage (S3) operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status, error_code, response_message) = match self {
            AppError::Precondition(_) => (
                StatusCode::BAD_REQUEST,
                "PRECONDITION_FAILED",
                self.to_string(),
            ),
            AppError::Validation(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                self.to_string(),
            ),
            AppError::Processing(err_str) => {
                tracing::error!("Provider processing error: {}", err_str);
                (
                    StatusCode::BAD_GATEWAY,
                    "PROCESSING_ERROR",
                    self.to_string(),
                )
            }
            AppError::Timeout(err_str) => {
                tracing::error!("Provider timeout: {}", err_str);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "PROCESSING_TIMEOUT",
                    self.to_string(),
                )
            }
            AppError::MalformedResponse(err_str) => {
                tracing::error!("Malformed provider response: {}", err_str);
                (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_PROVIDER_RESPONSE",
                    self.to_string(),
                )
            }
            AppError::Generation(err_str) => {
                tracing::error!("Generation provider error: {}", err_str);
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_ERROR",
                    self.to_string(),
                )
            }
            AppError::Persistence(err_str) => {
                tracing::error!("Persistence error: {}", err_str);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    self.to_string(),
                )
            }
            AppError::PartialPersistence(err_str) => {
                tracing::error!("Partial persistence: {}", err_str);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PARTIAL_PERSISTENCE",
                    self.to_string(),
                )
            }
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            AppError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", self.to_string())
            }
            AppError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string())
            }
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),
            AppError::Storage(err_str) => {
                tracing::error!("Storage error: {}", err_str);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "An internal storage error occurred".to_string(),
                )
            }
            AppError::Internal(err_str) => {
                tracing::error!("Internal error: {}", err_str);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code.to_string(),
            message: response_message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid UUID: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_validation_maps_to_422() {
        let err = AppError::Validation("theme".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_timeout_maps_to_504() {
        let err = AppError::Timeout("transcription".to_string());
        assert_eq!(err.error_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_database_detail_not_leaked() {
        let err = AppError::Database("secret connection string".to_string());
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_processing_and_generation_are_distinct() {
        let processing = AppError::Processing("OCR failed".to_string());
        let generation = AppError::Generation("provider call failed".to_string());
        assert_ne!(processing.to_string(), generation.to_string());
    }
}
