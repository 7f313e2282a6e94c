//! Alumni portal server
//!
//! Main application entry point

use std::time::Duration;
use anyhow::Context;
use tracing::{debug, info, warn};

use alumni_portal::{
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService, PoolConfig},
    server,
    services::ServiceFactory,
    utils::logging,
};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", alumni_portal::info());

    // Initialize database connection
    info!("Connecting to database...");
    let pool = create_pool(&PoolConfig::from(&settings.database)).await?;

    info!("Running database migrations...");
    run_migrations(&pool).await?;

    let database = DatabaseService::new(pool);

    if !settings.auth.super_admin_emails.is_empty() {
        let promoted = database
            .users
            .promote_super_admins(&settings.auth.super_admin_emails)
            .await?;
        if promoted > 0 {
            info!(count = promoted, "Promoted configured super admin accounts");
        }
    }

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(settings.clone(), database)?;

    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!(issue = %issue, "Startup health check");
    }

    let limiter = services.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.cleanup_old_entries();
            debug!(tracked = limiter.tracked_keys(), "Rate limiter entries pruned");
        }
    });

    server::run(settings, services).await?;

    info!("Alumni portal stopped");
    Ok(())
}
