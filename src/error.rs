/// Unified error types for CivicFix
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum CivicError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (missing or invalid session, bad credentials)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (role or membership denied)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Photo storage errors
    #[error("Photo storage error: {0}")]
    PhotoStorage(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Account banned
    #[error("{0}")]
    AccountBanned(String),
}

impl CivicError {
    /// Map a unique-constraint violation to `Conflict`, leave everything else untouched
    pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CivicError::Conflict(message.into())
            }
            _ => CivicError::Database(err),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert CivicError to HTTP response
impl IntoResponse for CivicError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            CivicError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            CivicError::Authorization(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            CivicError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            CivicError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            CivicError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            CivicError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            CivicError::AccountBanned(_) => {
                (StatusCode::FORBIDDEN, "AccountBanned", self.to_string())
            }
            CivicError::PhotoStorage(_)
            | CivicError::Database(_)
            | CivicError::Internal(_)
            | CivicError::Io(_)
            | CivicError::Jwt(_) => {
                tracing::error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for CivicFix operations
pub type CivicResult<T> = Result<T, CivicError>;
