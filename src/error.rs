//! Error types for the library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    DbFailure = 2,
    NoSuchData = 3,
    BadValue = 4,
    Duplicate = 5,
    NoCopiesAvailable = 6,
    AlreadyReturned = 7,
    CannotReturn = 8,
    HasDependents = 9,
}

/// Business rules that can refuse an operation.
///
/// These are normal outcomes, not faults: the operation did not happen and
/// nothing was written.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("No copies of this book are available")]
    NoCopiesAvailable,

    #[error("Loan has already been returned")]
    AlreadyReturned,

    #[error("Loan cannot be returned")]
    CannotReturn,

    #[error("Book has active loans")]
    BookHasActiveLoans,

    #[error("Author still has books")]
    AuthorHasBooks,

    #[error("Available copies cannot exceed total copies")]
    CopiesExceedTotal,
}

impl RuleViolation {
    fn code(self) -> ErrorCode {
        match self {
            RuleViolation::NoCopiesAvailable => ErrorCode::NoCopiesAvailable,
            RuleViolation::AlreadyReturned => ErrorCode::AlreadyReturned,
            RuleViolation::CannotReturn => ErrorCode::CannotReturn,
            RuleViolation::BookHasActiveLoans | RuleViolation::AuthorHasBooks => {
                ErrorCode::HasDependents
            }
            RuleViolation::CopiesExceedTotal => ErrorCode::BadValue,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(#[from] RuleViolation),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// True when the error comes from the storage layer rather than from a
    /// business decision or bad input.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Storage(_))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::BusinessRule(rule) => {
                (StatusCode::UNPROCESSABLE_ENTITY, rule.code(), rule.to_string())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Storage error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_violation_maps_to_unprocessable() {
        let response = AppError::from(RuleViolation::NoCopiesAvailable).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_storage_failure_classification() {
        assert!(AppError::Storage("disk full".to_string()).is_storage_failure());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_storage_failure());
        assert!(!AppError::from(RuleViolation::AlreadyReturned).is_storage_failure());
        assert!(!AppError::NotFound("loan".to_string()).is_storage_failure());
    }
}
