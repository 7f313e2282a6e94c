//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{PortalError, Result};
use super::{MailTransport, Settings};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_auth_config(&settings.auth)?;
    validate_mail_config(&settings.mail)?;
    validate_upload_config(&settings.uploads)?;
    validate_payment_config(&settings.payments)?;
    validate_rate_limit_config(&settings.rate_limit)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(PortalError::Config("Server host is required".to_string()));
    }

    url::Url::parse(&config.public_base_url).map_err(|e| {
        PortalError::Config(format!("Invalid public base URL '{}': {}", config.public_base_url, e))
    })?;

    if config.max_body_bytes == 0 {
        return Err(PortalError::Config(
            "Max body size must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(PortalError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(PortalError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(PortalError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.enabled && config.url.is_empty() {
        return Err(PortalError::Config(
            "Redis URL is required when the cache is enabled".to_string()
        ));
    }

    Ok(())
}

/// Validate authentication configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < 32 {
        return Err(PortalError::Config(
            "JWT secret must be at least 32 bytes".to_string()
        ));
    }

    if config.token_ttl_hours <= 0 {
        return Err(PortalError::Config(
            "Token TTL must be greater than 0".to_string()
        ));
    }

    if !(4..=10).contains(&config.otp.length) {
        return Err(PortalError::Config(
            format!("OTP length must be between 4 and 10, got {}", config.otp.length)
        ));
    }

    if config.otp.ttl_minutes <= 0 {
        return Err(PortalError::Config(
            "OTP TTL must be greater than 0".to_string()
        ));
    }

    if config.otp.max_attempts <= 0 {
        return Err(PortalError::Config(
            "OTP max attempts must be greater than 0".to_string()
        ));
    }

    if config.otp.resend_cooldown_seconds < 0 {
        return Err(PortalError::Config(
            "OTP resend cooldown cannot be negative".to_string()
        ));
    }

    Ok(())
}

/// Validate mail configuration
fn validate_mail_config(config: &super::MailConfig) -> Result<()> {
    if config.from_address.is_empty() {
        return Err(PortalError::Config(
            "Mail from address is required".to_string()
        ));
    }

    if config.transport == MailTransport::Http {
        let api_url = config.api_url.as_deref().unwrap_or_default();
        if api_url.is_empty() {
            return Err(PortalError::Config(
                "Mail API URL is required for the http transport".to_string()
            ));
        }
        url::Url::parse(api_url)?;
    }

    if config.timeout_seconds == 0 {
        return Err(PortalError::Config(
            "Mail timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate upload configuration
fn validate_upload_config(config: &super::UploadConfig) -> Result<()> {
    if config.dir.is_empty() {
        return Err(PortalError::Config(
            "Upload directory is required".to_string()
        ));
    }

    if config.max_file_bytes == 0 || config.max_files_per_upload == 0 {
        return Err(PortalError::Config(
            "Upload limits must be greater than 0".to_string()
        ));
    }

    if config.allowed_mime_types.is_empty() {
        return Err(PortalError::Config(
            "At least one allowed upload MIME type is required".to_string()
        ));
    }

    Ok(())
}

/// Validate payment configuration
fn validate_payment_config(config: &super::PaymentConfig) -> Result<()> {
    if config.currency.len() != 3 || !config.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PortalError::Config(
            format!("Invalid currency code: {}", config.currency)
        ));
    }

    Ok(())
}

/// Validate rate limit configuration
fn validate_rate_limit_config(config: &super::RateLimitSettings) -> Result<()> {
    if config.max_requests == 0 || config.window_seconds == 0 {
        return Err(PortalError::Config(
            "Rate limit requests and window must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(PortalError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(PortalError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
