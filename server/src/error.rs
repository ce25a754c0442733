//! Error types for NoteHub
//!
//! All errors use thiserror for structured error handling.
//! Each variant maps to one HTTP response in `IntoResponse`, so handlers can
//! return `Result<_, AppError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("File type not allowed: {0}")]
    InvalidExtension(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("You do not own this note")]
    Forbidden,

    #[error("Note not found: {0}")]
    NotFound(i64),

    #[error("Content missing for note {0}")]
    BrokenReference(i64),

    #[error("Login required")]
    Unauthenticated,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} failed: {reason}")]
    Migration { version: i64, reason: String },
}

impl AppError {
    /// Stable machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::MissingField(_) => "missing_field",
            AppError::InvalidCategory(_) => "invalid_category",
            AppError::InvalidExtension(_) => "invalid_extension",
            AppError::DuplicateEmail => "duplicate_email",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) | AppError::BlobNotFound(_) => "not_found",
            AppError::BrokenReference(_) => "broken_reference",
            AppError::Unauthenticated => "unauthenticated",
            AppError::BadRequest(_) => "bad_request",
            AppError::PasswordHash(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Migration { .. } => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::MissingField(_)
            | AppError::InvalidCategory(_)
            | AppError::InvalidExtension(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::BlobNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BrokenReference(_) => StatusCode::GONE,
            AppError::PasswordHash(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Migration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Unauthenticated = self {
            return Redirect::to("/login").into_response();
        }

        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "kind": self.kind(),
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
