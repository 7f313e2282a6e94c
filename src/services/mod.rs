//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod cache;
pub mod content;
pub mod mailer;
pub mod otp;
pub mod payment;
pub mod storage;
pub mod user;

// Re-export commonly used services
pub use auth::{AuthService, Claims, TokenService};
pub use cache::CacheService;
pub use content::ContentService;
pub use mailer::{Mailer, MailMessage};
pub use otp::{OtpService, OtpCheck};
pub use payment::PaymentService;
pub use storage::{StorageService, UploadedFile};
pub use user::UserService;

use serde::Serialize;
use crate::config::Settings;
use crate::database::DatabaseService;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub content_service: ContentService,
    pub payment_service: PaymentService,
    pub cache_service: CacheService,
    pub storage_service: StorageService,
    pub rate_limiter: RateLimiter,
    database: DatabaseService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: Settings, database: DatabaseService) -> Result<Self> {
        let cache_service = CacheService::new(&settings.redis)?;
        let storage_service = StorageService::new(settings.uploads.clone());
        let rate_limiter = RateLimiter::new(RateLimitConfig::from(&settings.rate_limit));
        let mailer = Mailer::new(settings.mail.clone())?;

        let auth_service = AuthService::new(
            database.users.clone(),
            mailer,
            rate_limiter.clone(),
            settings.clone(),
        );
        let user_service = UserService::new(
            database.users.clone(),
            database.contents.clone(),
            storage_service.clone(),
            cache_service.clone(),
        );
        let content_service = ContentService::new(
            database.contents.clone(),
            storage_service.clone(),
            cache_service.clone(),
            settings.clone(),
        );
        let payment_service = PaymentService::new(database.transactions.clone(), settings);

        Ok(Self {
            auth_service,
            user_service,
            content_service,
            payment_service,
            cache_service,
            storage_service,
            rate_limiter,
            database,
        })
    }

    pub fn database(&self) -> &DatabaseService {
        &self.database
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = self.database.health_check().await.is_ok();
        let cache_enabled = self.cache_service.is_enabled();
        let cache_healthy = self.cache_service.health_check().await;

        ServiceHealthStatus {
            database_healthy,
            cache_enabled,
            cache_healthy,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub cache_enabled: bool,
    pub cache_healthy: bool,
}

impl ServiceHealthStatus {
    /// The database is the only hard dependency; the cache degrades to misses
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if self.cache_enabled && !self.cache_healthy {
            issues.push("Redis connection failed".to_string());
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_issues() {
        let status = ServiceHealthStatus {
            database_healthy: true,
            cache_enabled: true,
            cache_healthy: false,
        };
        assert!(status.is_healthy());
        assert_eq!(status.get_issues(), vec!["Redis connection failed".to_string()]);

        let status = ServiceHealthStatus {
            database_healthy: false,
            cache_enabled: false,
            cache_healthy: true,
        };
        assert!(!status.is_healthy());
        assert_eq!(status.get_issues().len(), 1);
    }
}
