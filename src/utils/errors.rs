//! Error handling for the alumni portal
//!
//! This module defines the main error type used throughout the application
//! and how each variant is reported to HTTP clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main error type for the portal
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Content not found: {0}")]
    ContentNotFound(String),

    #[error("Photo not found: {photo_id}")]
    PhotoNotFound { photo_id: i64 },

    #[error("Transaction not found: {transaction_id}")]
    TransactionNotFound { transaction_id: i64 },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Upload error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for portal operations
pub type Result<T> = std::result::Result<T, PortalError>;

impl PortalError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            PortalError::Database(_) => false,
            PortalError::Migration(_) => false,
            PortalError::Config(_) => false,
            PortalError::PermissionDenied(_) => false,
            PortalError::UserNotFound { .. } => false,
            PortalError::ContentNotFound(_) => false,
            PortalError::PhotoNotFound { .. } => false,
            PortalError::TransactionNotFound { .. } => false,
            PortalError::InvalidStateTransition { .. } => false,
            PortalError::Conflict(_) => false,
            PortalError::Redis(_) => true,
            PortalError::Http(_) => true,
            PortalError::Serialization(_) => false,
            PortalError::Io(_) => true,
            PortalError::UrlParse(_) => false,
            PortalError::Multipart(_) => false,
            PortalError::Token(_) => false,
            PortalError::Authentication(_) => false,
            PortalError::RateLimitExceeded => true,
            PortalError::InvalidInput(_) => false,
            PortalError::PayloadTooLarge(_) => false,
            PortalError::ServiceUnavailable(_) => true,
            PortalError::Internal(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PortalError::Database(_) => ErrorSeverity::Critical,
            PortalError::Migration(_) => ErrorSeverity::Critical,
            PortalError::Config(_) => ErrorSeverity::Critical,
            PortalError::PermissionDenied(_) => ErrorSeverity::Warning,
            PortalError::Authentication(_) => ErrorSeverity::Warning,
            PortalError::Token(_) => ErrorSeverity::Warning,
            PortalError::RateLimitExceeded => ErrorSeverity::Warning,
            PortalError::InvalidInput(_) => ErrorSeverity::Info,
            PortalError::InvalidStateTransition { .. } => ErrorSeverity::Info,
            PortalError::Conflict(_) => ErrorSeverity::Info,
            PortalError::UserNotFound { .. }
            | PortalError::ContentNotFound(_)
            | PortalError::PhotoNotFound { .. }
            | PortalError::TransactionNotFound { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status reported to the client
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::InvalidInput(_) | PortalError::InvalidStateTransition { .. } => {
                StatusCode::BAD_REQUEST
            }
            // Body-limit violations surface here as 413
            PortalError::Multipart(e) => e.status(),
            PortalError::Authentication(_) | PortalError::Token(_) => StatusCode::UNAUTHORIZED,
            PortalError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            PortalError::UserNotFound { .. }
            | PortalError::ContentNotFound(_)
            | PortalError::PhotoNotFound { .. }
            | PortalError::TransactionNotFound { .. } => StatusCode::NOT_FOUND,
            PortalError::Conflict(_) => StatusCode::CONFLICT,
            PortalError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            PortalError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            PortalError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    fn public_message(&self) -> String {
        match self {
            PortalError::Token(_) => "invalid or expired token".to_string(),
            PortalError::Authentication(msg)
            | PortalError::PermissionDenied(msg)
            | PortalError::InvalidInput(msg)
            | PortalError::Conflict(msg)
            | PortalError::PayloadTooLarge(msg)
            | PortalError::ServiceUnavailable(msg) => msg.clone(),
            PortalError::ContentNotFound(what) => format!("content not found: {}", what),
            PortalError::UserNotFound { user_id } => format!("user {} not found", user_id),
            PortalError::PhotoNotFound { photo_id } => format!("photo {} not found", photo_id),
            PortalError::TransactionNotFound { transaction_id } => {
                format!("transaction {} not found", transaction_id)
            }
            PortalError::InvalidStateTransition { .. }
            | PortalError::Multipart(_)
            | PortalError::RateLimitExceeded => self.to_string(),
            _ => "an internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(
                    error = %self,
                    severity = %self.severity(),
                    recoverable = self.is_recoverable(),
                    "Request failed"
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(error = %self, "Request rejected");
            }
            ErrorSeverity::Info => {
                tracing::debug!(error = %self, "Request rejected");
            }
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
