//! Error types for the Bookshelf service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::repository::StoreError;

/// Stable error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    StoreFailure = 3,
    NoSuchBook = 4,
    BookUnavailable = 5,
    Duplicate = 6,
    InvalidFilter = 7,
    BadValue = 8,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Book not found: {0}")]
    NotFound(String),

    #[error("Book already exists: {0}")]
    Duplicate(String),

    #[error("Book {0} is not available for checkout")]
    BookUnavailable(String),

    #[error("Book {0} cannot hold any more copies")]
    QuantityOverflow(String),

    #[error("Can't filter by author and title simultaneously")]
    InvalidFilter,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("{operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Translate a store failure into the service taxonomy, keeping the
    /// name of the store call for anything that is not a domain condition.
    pub fn from_store(operation: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFound(id),
            StoreError::Duplicate(what) => AppError::Duplicate(what),
            StoreError::Exhausted(id) => AppError::BookUnavailable(id),
            StoreError::QuantityOverflow(id) => AppError::QuantityOverflow(id),
            source => AppError::Store { operation, source },
        }
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
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook, self.to_string()),
            AppError::Duplicate(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate, self.to_string()),
            AppError::BookUnavailable(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BookUnavailable, self.to_string())
            }
            AppError::QuantityOverflow(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, self.to_string())
            }
            AppError::InvalidFilter => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidFilter, self.to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Store { operation, source } => {
                tracing::error!(operation, error = ?source, "Store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::StoreFailure,
                    "Store error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
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
