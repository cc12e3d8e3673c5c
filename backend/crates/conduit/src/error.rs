//! Conduit Error Types
//!
//! This module provides the closed set of Conduit error kinds and integrates
//! them with the unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Message returned to callers for every server-side failure
const INTERNAL_MESSAGE: &str = "internal error";

/// Conduit-specific result type alias
pub type ConduitResult<T> = Result<T, ConduitError>;

/// Conduit-specific error variants
#[derive(Debug, Error)]
pub enum ConduitError {
    /// Referenced user, article or comment does not exist
    #[error("resource not found")]
    NotFound,

    /// Login password did not match the stored hash
    #[error("invalid password")]
    InvalidCredential,

    /// Follow target is the caller
    #[error("can not follow oneself")]
    SelfFollow,

    /// Email or username already taken
    #[error("duplicated email or username")]
    DuplicateIdentifier,

    /// Caller does not own the article or comment being mutated
    #[error("user is not author of content")]
    NonOwnedContent,

    /// Route requires a valid access token
    #[error("authentication is required")]
    AuthenticationRequired,

    /// Route must be called without an access token
    #[error("authentication is not required")]
    AuthenticationNotAllowed,

    /// Request shape or field validation failed
    #[error("{0}")]
    Validation(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConduitError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    ///
    /// Missing resources and rule violations are reported as 400, not 404.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConduitError::NotFound
            | ConduitError::InvalidCredential
            | ConduitError::SelfFollow
            | ConduitError::DuplicateIdentifier
            | ConduitError::AuthenticationNotAllowed
            | ConduitError::Validation(_) => ErrorKind::BadRequest,
            ConduitError::NonOwnedContent => ErrorKind::Forbidden,
            ConduitError::AuthenticationRequired => ErrorKind::Unauthorized,
            ConduitError::Database(_) | ConduitError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError, hiding server-side details
    pub fn to_app_error(&self) -> AppError {
        if self.kind().is_server_error() {
            AppError::new(self.kind(), INTERNAL_MESSAGE)
        } else {
            AppError::new(self.kind(), self.to_string())
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            ConduitError::Database(e) => {
                tracing::error!(error = %e, "Conduit database error");
            }
            ConduitError::Internal(msg) => {
                tracing::error!(message = %msg, "Conduit internal error");
            }
            ConduitError::InvalidCredential => {
                tracing::warn!("Invalid login attempt");
            }
            ConduitError::NonOwnedContent => {
                tracing::warn!("Attempt to modify content owned by another user");
            }
            _ => {
                tracing::debug!(error = %self, "Conduit error");
            }
        }
    }
}

impl IntoResponse for ConduitError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for ConduitError {
    fn from(err: AppError) -> Self {
        if err.is_client_error() {
            ConduitError::Validation(err.message().to_string())
        } else {
            ConduitError::Internal(err.to_string())
        }
    }
}

impl From<platform::password::PasswordPolicyError> for ConduitError {
    fn from(err: platform::password::PasswordPolicyError) -> Self {
        ConduitError::Validation(err.to_string())
    }
}

impl From<platform::password::PasswordHashError> for ConduitError {
    fn from(err: platform::password::PasswordHashError) -> Self {
        ConduitError::Internal(err.to_string())
    }
}

impl From<platform::token::TokenError> for ConduitError {
    fn from(err: platform::token::TokenError) -> Self {
        ConduitError::Internal(err.to_string())
    }
}
