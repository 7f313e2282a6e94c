//! Database connection management

use std::time::{Duration, Instant};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;
use crate::utils::logging::log_database_operation;
use crate::utils::errors::PortalError;

pub type DatabasePool = Pool<Postgres>;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/alumni_portal".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

impl From<&crate::config::DatabaseConfig> for PoolConfig {
    fn from(config: &crate::config::DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            ..Self::default()
        }
    }
}

/// Open the pool and make sure the server answers
pub async fn create_pool(config: &PoolConfig) -> Result<DatabasePool, PortalError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool ready"
    );
    Ok(pool)
}

/// Apply the embedded migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), PortalError> {
    let migrator = sqlx::migrate!("./migrations");
    let start = Instant::now();

    migrator.run(pool).await?;

    info!(
        migrations = migrator.iter().count(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database schema up to date"
    );
    Ok(())
}

/// Round trip to the server; used at startup and by `/health`
pub async fn health_check(pool: &DatabasePool) -> Result<(), PortalError> {
    let start = Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    log_database_operation("health_check", "-", duration_ms, result.is_ok());
    result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_from_settings() {
        let settings = crate::config::Settings::default();
        let config = PoolConfig::from(&settings.database);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert!(config.url.starts_with("postgresql://"));
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
    }
}
