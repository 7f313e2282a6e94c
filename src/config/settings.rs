//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub uploads: UploadConfig,
    pub payments: PaymentConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used to build absolute links to uploaded photos
    pub public_base_url: String,
    /// Allowed CORS origins; empty means same-origin only, `*` means any
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Accounts registered with these emails become super admins
    pub super_admin_emails: Vec<String>,
    pub otp: OtpConfig,
}

/// One-time password configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    pub length: u32,
    pub ttl_minutes: i64,
    pub max_attempts: i32,
    pub resend_cooldown_seconds: i64,
}

/// Outbound mail transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTransport {
    /// Write messages to the log only
    Log,
    /// POST messages to an HTTP mail API
    Http,
}

/// Mail configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub from_address: String,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

/// Upload storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    pub dir: String,
    pub max_file_bytes: usize,
    pub max_files_per_upload: usize,
    pub allowed_mime_types: Vec<String>,
}

/// Payment stub configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
    pub provider: String,
    pub currency: String,
    pub stripe_key: Option<String>,
    pub razorpay_key: Option<String>,
}

/// Request rate limiting for sensitive endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window_seconds: u64,
    pub burst_allowance: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    pub json: bool,
    pub slow_request_ms: u64,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub registration_open: bool,
    /// Uploads from rep admins and above skip the moderation queue
    pub auto_approve_staff_uploads: bool,
    pub payments_enabled: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables.
    ///
    /// Environment variables use the `ALUMNI` prefix and `__` as the section
    /// separator, e.g. `ALUMNI__DATABASE__URL`.
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("ALUMNI")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("auth.super_admin_emails")
                    .with_list_parse_key("uploads.allowed_mime_types")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::PortalError> {
        super::validation::validate_settings(self)
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                public_base_url: "http://localhost:8080".to_string(),
                cors_origins: vec!["http://localhost:5173".to_string()],
                max_body_bytes: 50 * 1024 * 1024,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/alumni_portal".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                enabled: false,
                url: "redis://localhost:6379".to_string(),
                prefix: "alumni:".to_string(),
                ttl_seconds: 300,
            },
            auth: AuthConfig {
                jwt_secret: "development-secret-change-me-0123456789".to_string(),
                token_ttl_hours: 24,
                super_admin_emails: vec![],
                otp: OtpConfig {
                    length: 6,
                    ttl_minutes: 10,
                    max_attempts: 5,
                    resend_cooldown_seconds: 60,
                },
            },
            mail: MailConfig {
                transport: MailTransport::Log,
                from_address: "no-reply@alumni.local".to_string(),
                api_url: None,
                api_key: None,
                timeout_seconds: 10,
            },
            uploads: UploadConfig {
                dir: "uploads".to_string(),
                max_file_bytes: 10 * 1024 * 1024,
                max_files_per_upload: 20,
                allowed_mime_types: vec![
                    "image/jpeg".to_string(),
                    "image/png".to_string(),
                    "image/webp".to_string(),
                    "image/gif".to_string(),
                ],
            },
            payments: PaymentConfig {
                provider: "stub".to_string(),
                currency: "INR".to_string(),
                stripe_key: None,
                razorpay_key: None,
            },
            rate_limit: RateLimitSettings {
                max_requests: 10,
                window_seconds: 60,
                burst_allowance: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
                json: false,
                slow_request_ms: 1000,
            },
            features: FeaturesConfig {
                registration_open: true,
                auto_approve_staff_uploads: true,
                payments_enabled: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_mail_transport_names() {
        let transport: MailTransport = serde_json::from_str("\"http\"").unwrap();
        assert_eq!(transport, MailTransport::Http);
        assert_eq!(serde_json::to_string(&MailTransport::Log).unwrap(), "\"log\"");
    }
}
