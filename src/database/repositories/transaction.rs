//! Transaction repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::transaction::{Transaction, TransactionKind, TransactionStatus};
use crate::utils::errors::PortalError;
use crate::utils::helpers::Pagination;

const TRANSACTION_COLUMNS: &str = "id, user_id, amount, currency, kind, status, provider, provider_ref, note, created_at, updated_at";

/// Row values for a new payment
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
    pub kind: TransactionKind,
    pub provider: String,
    pub provider_ref: String,
    pub note: Option<String>,
}

#[derive(Clone)]
#[derive(Debug)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending transaction
    pub async fn create(&self, new: NewTransaction) -> Result<Transaction, PortalError> {
        let sql = format!(
            r#"
            INSERT INTO transactions (user_id, amount, currency, kind, status, provider, provider_ref, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $8)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        );

        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(new.user_id)
            .bind(new.amount)
            .bind(new.currency)
            .bind(new.kind.as_str())
            .bind(new.provider)
            .bind(new.provider_ref)
            .bind(new.note)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(transaction)
    }

    /// Find transaction by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Transaction>, PortalError> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(transaction)
    }

    /// A user's own transactions, newest first
    pub async fn list_for_user(&self, user_id: i64, page: Pagination) -> Result<(Vec<Transaction>, i64), PortalError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );

        let items = sqlx::query_as::<_, Transaction>(&sql)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total.0))
    }

    /// All transactions, optionally restricted to one status
    pub async fn list(&self, status: Option<TransactionStatus>, page: Pagination) -> Result<(Vec<Transaction>, i64), PortalError> {
        let status = status.map(|s| s.as_str());
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );

        let items = sqlx::query_as::<_, Transaction>(&sql)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE ($1::TEXT IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total.0))
    }

    /// Settle a transaction if it is still pending. Returns `None` when the
    /// row was already settled by someone else.
    pub async fn settle(&self, id: i64, status: TransactionStatus) -> Result<Option<Transaction>, PortalError> {
        let sql = format!(
            "UPDATE transactions SET status = $2, updated_at = $3 WHERE id = $1 AND status = 'pending' RETURNING {TRANSACTION_COLUMNS}"
        );

        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        Ok(transaction)
    }

    /// Completed payment count and per-currency totals
    pub async fn completed_totals(&self) -> Result<Vec<(String, i64, i64)>, PortalError> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT currency, COUNT(*), COALESCE(SUM(amount), 0)::BIGINT
            FROM transactions
            WHERE status = 'completed'
            GROUP BY currency
            ORDER BY currency
            "#
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
