//! Error types for the Signoff Control Plane server.
//!
//! This module provides custom error types that implement `IntoResponse`
//! for seamless integration with Axum handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors for the control plane.
///
/// The first four variants are recoverable by the caller (4xx); the rest are
/// infrastructure failures that propagate and abort the operation.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or internally inconsistent input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced resource does not exist or is not visible to the tenant
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Actor lacks standing to act
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Action violates a state invariant
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a Postgres unique-violation onto `Conflict`; everything else stays
    /// a `Database` error. Used where a schema constraint closes a race the
    /// application check alone could not (double votes, duplicate
    /// resubmissions, duplicate delegation rules).
    pub fn conflict_on_unique(err: impl Into<AppError>, message: impl Into<String>) -> Self {
        let err = err.into();
        if let AppError::Database(sqlx::Error::Database(ref db_err)) = err {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::Conflict(message.into());
            }
        }
        err
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound("Instance not found".to_string());
        assert_eq!(err.to_string(), "Resource not found: Instance not found");
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation("Duplicate stage order(s): 2".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: Duplicate stage order(s): 2"
        );
    }

    #[test]
    fn test_conflict_on_unique_passthrough() {
        // Non-database errors keep their Database classification
        let err = AppError::conflict_on_unique(sqlx::Error::RowNotFound, "duplicate");
        assert!(matches!(err, AppError::Database(_)));
    }
}
