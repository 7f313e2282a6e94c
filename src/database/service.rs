//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::database::{DatabasePool, UserRepository, ContentRepository, TransactionRepository};
use crate::models::{ContentStatus, DashboardStats};
use crate::utils::errors::PortalError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub contents: ContentRepository,
    pub transactions: TransactionRepository,
    pool: DatabasePool,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            contents: ContentRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Ping the database
    pub async fn health_check(&self) -> Result<(), PortalError> {
        crate::database::health_check(&self.pool).await
    }

    /// Aggregate counts for the admin dashboard
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, PortalError> {
        let total_users = self.users.count().await?;
        let users_by_role = self.users.count_by_role().await?.into_iter().collect();
        let content_by_status: std::collections::BTreeMap<String, i64> =
            self.contents.count_by_status().await?.into_iter().collect();
        let pending_moderation = content_by_status
            .get(ContentStatus::Pending.as_str())
            .copied()
            .unwrap_or(0);

        let mut completed_payments = 0;
        let mut completed_amounts = std::collections::BTreeMap::new();
        for (currency, count, amount) in self.transactions.completed_totals().await? {
            completed_payments += count;
            completed_amounts.insert(currency, amount);
        }

        Ok(DashboardStats {
            total_users,
            users_by_role,
            content_by_status,
            pending_moderation,
            completed_payments,
            completed_amounts,
        })
    }
}
