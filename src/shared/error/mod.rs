//! Unified error handling
//!
//! Defines every error the service can surface and how it maps to an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Database failures
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or invalid bearer token
    #[error("authentication error: {0}")]
    Authentication(#[from] crate::auth::AuthError),

    /// Request payload rejected; `details` carries one entry per violation
    #[error("{message}")]
    Validation { message: String, details: Vec<Value> },

    /// Request refused by a business rule
    #[error("{0}")]
    Business(String),

    /// A sibling service failed or answered with an error status
    #[error("{message}")]
    ExternalService { status: StatusCode, message: String },

    /// Invoice could not be created
    #[error("{0}")]
    PaymentRequired(String),

    /// Configuration problem
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),

    /// Caller lacks the needed role or business authorization
    #[error("{0}")]
    Forbidden(String),

    /// Resource does not exist
    #[error("{0}")]
    NotFound(String),
}

impl AppError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Business(_) => StatusCode::BAD_REQUEST,
            AppError::ExternalService { status, .. } => *status,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Stable error code carried in the response body
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Authentication(_) => "AUTH_ERROR",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Business(_) => "BUSINESS_ERROR",
            AppError::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            AppError::PaymentRequired(_) => "PAYMENT_REQUIRED",
            AppError::Configuration(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
        }
    }

    /// External service failure with the given status
    pub fn external(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::ExternalService { status, message: message.into() }
    }

    /// Validation failure without per-field details
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Validation { message: message.into(), details: Vec::new() }
    }

    fn details(&self) -> Vec<Value> {
        match self {
            AppError::Validation { details, .. } => details.clone(),
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_code = self.error_code();

        tracing::error!(
            status = ?status_code,
            error_code = error_code,
            error = %self,
            "request failed"
        );

        // Storage and internal failures keep their cause in the log only
        let message = match &self {
            AppError::Database(_) | AppError::Internal(_) | AppError::Configuration(_) => {
                "Internal server error.".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "code": error_code,
            "message": message,
            "details": self.details(),
        }));

        (status_code, body).into_response()
    }
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

/// Builds a business-rule error
#[macro_export]
macro_rules! business_error {
    ($msg:expr) => {
        $crate::shared::error::AppError::Business($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::shared::error::AppError::Business(format!($fmt, $($arg)*))
    };
}

/// Builds a validation error without details
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::shared::error::AppError::invalid($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::shared::error::AppError::invalid(format!($fmt, $($arg)*))
    };
}

/// Builds an internal error
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::shared::error::AppError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::shared::error::AppError::Internal(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::PaymentRequired("x".into()).status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            AppError::external(StatusCode::SERVICE_UNAVAILABLE, "down").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(validation_error!("bad {}", 1).status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_details_in_body() {
        let error = AppError::Validation {
            message: "Invalid request".into(),
            details: vec![json!({"message": "missing"})],
        };
        assert_eq!(error.details().len(), 1);
        assert_eq!(error.to_string(), "Invalid request");
        assert!(business_error!("x").details().is_empty());
    }
}
