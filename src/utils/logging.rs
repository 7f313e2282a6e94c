//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the portal.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::{PortalError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard must be held for the lifetime of the process,
/// dropping it stops the file writer.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "alumni-portal.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .map_err(|e| PortalError::Config(format!("Invalid log filter: {}", e)))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout));

    if config.json {
        registry
            .with(file_layer.json())
            .try_init()
            .map_err(|e| PortalError::Config(e.to_string()))?;
    } else {
        registry
            .with(file_layer)
            .try_init()
            .map_err(|e| PortalError::Config(e.to_string()))?;
    }

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log user actions with structured data
pub fn log_user_action(user_id: i64, action: &str, details: Option<&str>) {
    info!(
        user_id = user_id,
        action = action,
        details = details,
        "User action performed"
    );
}

/// Log authentication attempts
pub fn log_auth_event(email: &str, action: &str, success: bool, details: Option<&str>) {
    if success {
        info!(
            email = email,
            action = action,
            details = details,
            "Authentication event: success"
        );
    } else {
        warn!(
            email = email,
            action = action,
            details = details,
            "Authentication event: failure"
        );
    }
}

/// Log content lifecycle actions (create, edit, moderate, delete)
pub fn log_content_action(content_id: i64, action: &str, user_id: i64, details: Option<&str>) {
    info!(
        content_id = content_id,
        action = action,
        user_id = user_id,
        details = details,
        "Content action performed"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}

/// Log API errors with context
pub fn log_api_error(api: &str, error: &str, context: Option<&str>) {
    error!(
        api = api,
        error = error,
        context = context,
        "API error occurred"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
