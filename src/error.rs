//! Error types for the library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 2,
    BadValue = 3,
    InvalidId = 4,
    NoSuchUser = 5,
    UserBlocked = 6,
    NoSuchBook = 7,
    BookBorrowed = 8,
    NoSuchBorrow = 9,
    AlreadyReturned = 10,
    InvalidRange = 11,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("User not found")]
    UserNotFound,

    #[error("User is blocked")]
    UserBlocked,

    #[error("Book not found")]
    BookNotFound,

    #[error("Book is already borrowed")]
    BookAlreadyBorrowed,

    #[error("Borrow not found")]
    BorrowNotFound,

    #[error("Book already returned")]
    AlreadyReturned,

    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures of the underlying store rather than domain outcomes
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
        let (status, code) = match &self {
            AppError::InvalidId(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidId),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, ErrorCode::NoSuchUser),
            AppError::UserBlocked => (StatusCode::FORBIDDEN, ErrorCode::UserBlocked),
            AppError::BookNotFound => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            AppError::BookAlreadyBorrowed => (StatusCode::CONFLICT, ErrorCode::BookBorrowed),
            AppError::BorrowNotFound => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBorrow),
            AppError::AlreadyReturned => (StatusCode::CONFLICT, ErrorCode::AlreadyReturned),
            AppError::InvalidRange { .. } => (StatusCode::BAD_REQUEST, ErrorCode::InvalidRange),
            AppError::Validation(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue)
            }
            AppError::Database(_) | AppError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure)
            }
        };

        if self.is_storage_failure() {
            tracing::error!("Store failure: {}", self);
        }

        let message = match code {
            ErrorCode::DbFailure => "Database error".to_string(),
            ErrorCode::Failure => "Internal server error".to_string(),
            _ => self.to_string(),
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
    fn test_domain_errors_map_to_client_statuses() {
        let cases = [
            (AppError::InvalidId("x".into()), StatusCode::BAD_REQUEST),
            (AppError::UserNotFound, StatusCode::NOT_FOUND),
            (AppError::UserBlocked, StatusCode::FORBIDDEN),
            (AppError::BookNotFound, StatusCode::NOT_FOUND),
            (AppError::BookAlreadyBorrowed, StatusCode::CONFLICT),
            (AppError::BorrowNotFound, StatusCode::NOT_FOUND),
            (AppError::AlreadyReturned, StatusCode::CONFLICT),
            (AppError::Validation("title".into()), StatusCode::BAD_REQUEST),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_storage_failures_are_internal() {
        let error = AppError::Storage("lock poisoned".into());
        assert!(error.is_storage_failure());
        assert_eq!(error.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!AppError::UserNotFound.is_storage_failure());
    }
}
