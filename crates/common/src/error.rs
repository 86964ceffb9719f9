//! Error types for matchup.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Workflow Outcomes ===
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate pending request: {0}")]
    DuplicatePending(String),

    #[error("Not eligible: {0}")]
    NotEligible(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Already decided: {0}")]
    AlreadyDecided(String),

    #[error("Consistency failure: {0}")]
    ConsistencyFailure(String),

    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicatePending(_) | Self::AlreadyDecided(_) => StatusCode::CONFLICT,
            Self::NotEligible(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotAuthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,

            Self::ConsistencyFailure(_)
            | Self::Database(_)
            | Self::Redis(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::DuplicatePending(_) => "DUPLICATE_PENDING",
            Self::NotEligible(_) => "NOT_ELIGIBLE",
            Self::NotAuthorized(_) => "NOT_AUTHORIZED",
            Self::AlreadyDecided(_) => "ALREADY_DECIDED",
            Self::ConsistencyFailure(_) => "CONSISTENCY_FAILURE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Whether an automated retry of the failed step can succeed.
    ///
    /// User-facing workflow outcomes are final; infrastructure failures are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConsistencyFailure(_) | Self::Database(_) | Self::Redis(_) | Self::Internal(_)
        )
    }
}

/// Whether a database error was caused by a unique constraint or unique index.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
