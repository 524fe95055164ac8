//! Error types for jukebox-server
//!
//! Defines the request-handling error taxonomy using thiserror. A
//! duplicate payment delivery is not an error; it is the
//! `PaymentOutcome::Duplicate` success value in the payment module.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Main error type for jukebox-server
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Credit balance exhausted for a credit-gated admission
    #[error("No credits remaining")]
    InsufficientCredits,

    /// Requested song id is not in the catalog
    #[error("Unknown song: {0}")]
    UnknownSong(String),

    /// Refill amount must be a positive integer
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Write transaction kept conflicting after bounded retries; the
    /// caller may retry the whole request
    #[error("Transaction conflict, please retry")]
    TransactionConflict,

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using jukebox-server Error
pub type Result<T> = std::result::Result<T, Error>;

/// JSON error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl Error {
    /// HTTP status for this error
    ///
    /// TransactionConflict maps to 409 so clients know the request is
    /// safe to retry as-is.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InsufficientCredits => StatusCode::FORBIDDEN,
            Error::UnknownSong(_) => StatusCode::NOT_FOUND,
            Error::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            Error::TransactionConflict => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Database(_) | Error::Config(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal failure details stay in the logs, not in responses
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
