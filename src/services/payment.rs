//! Payment stub
//!
//! Records donations, membership fees and event fees as transactions without
//! talking to a gateway. A created transaction stays pending until its owner
//! confirms or cancels it.

use tracing::info;
use crate::config::Settings;
use crate::database::repositories::{NewTransaction, TransactionRepository};
use crate::models::transaction::{CreateTransactionRequest, Transaction, TransactionStatus};
use crate::models::user::Actor;
use crate::utils::errors::{PortalError, Result};
use crate::utils::helpers::{generate_random_string, Paginated, Pagination};

const MAX_NOTE_LENGTH: usize = 500;

/// Check the amount and resolve the currency of a new payment
pub fn validate_request(request: &CreateTransactionRequest, default_currency: &str) -> Result<String> {
    if request.amount <= 0 {
        return Err(PortalError::InvalidInput("amount must be positive".to_string()));
    }

    let currency = request
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(default_currency)
        .to_ascii_uppercase();

    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PortalError::InvalidInput(format!("invalid currency {currency}")));
    }

    if let Some(note) = &request.note {
        if note.chars().count() > MAX_NOTE_LENGTH {
            return Err(PortalError::InvalidInput("note is too long".to_string()));
        }
    }

    Ok(currency)
}

#[derive(Clone)]
#[derive(Debug)]
pub struct PaymentService {
    transactions: TransactionRepository,
    settings: Settings,
}

impl PaymentService {
    pub fn new(transactions: TransactionRepository, settings: Settings) -> Self {
        Self { transactions, settings }
    }

    fn ensure_enabled(&self) -> Result<()> {
        if !self.settings.features.payments_enabled {
            return Err(PortalError::ServiceUnavailable("payments are disabled".to_string()));
        }
        Ok(())
    }

    /// Start a payment; the checkout step is stubbed
    pub async fn create(&self, actor: &Actor, request: CreateTransactionRequest) -> Result<Transaction> {
        self.ensure_enabled()?;
        let currency = validate_request(&request, &self.settings.payments.currency)?;

        let provider = self.settings.payments.provider.clone();
        let provider_ref = format!("{}_{}", provider, generate_random_string(16));

        let transaction = self
            .transactions
            .create(NewTransaction {
                user_id: actor.id,
                amount: request.amount,
                currency,
                kind: request.kind,
                provider,
                provider_ref,
                note: request.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            })
            .await?;

        info!(
            transaction_id = transaction.id,
            user_id = actor.id,
            amount = transaction.amount,
            currency = %transaction.currency,
            kind = %transaction.kind,
            "Payment created"
        );
        Ok(transaction)
    }

    /// Mark a pending payment completed
    pub async fn confirm(&self, actor: &Actor, id: i64) -> Result<Transaction> {
        self.settle(actor, id, TransactionStatus::Completed).await
    }

    /// Cancel a pending payment
    pub async fn cancel(&self, actor: &Actor, id: i64) -> Result<Transaction> {
        self.settle(actor, id, TransactionStatus::Cancelled).await
    }

    async fn settle(&self, actor: &Actor, id: i64, target: TransactionStatus) -> Result<Transaction> {
        self.ensure_enabled()?;

        // Other users' payments look absent
        let transaction = match self.transactions.find_by_id(id).await? {
            Some(t) if t.user_id == actor.id => t,
            _ => return Err(PortalError::TransactionNotFound { transaction_id: id }),
        };

        if !transaction.status.can_transition_to(target) {
            return Err(PortalError::InvalidStateTransition {
                from: transaction.status.to_string(),
                to: target.to_string(),
            });
        }

        let settled = self
            .transactions
            .settle(id, target)
            .await?
            .ok_or_else(|| PortalError::InvalidStateTransition {
                from: transaction.status.to_string(),
                to: target.to_string(),
            })?;

        info!(transaction_id = id, user_id = actor.id, status = %target, "Payment settled");
        Ok(settled)
    }

    /// The caller's payments
    pub async fn list_for_user(&self, actor: &Actor, page: Pagination) -> Result<Paginated<Transaction>> {
        self.ensure_enabled()?;
        let (items, total) = self.transactions.list_for_user(actor.id, page).await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Every payment, for the admin listing
    pub async fn list_all(&self, status: Option<TransactionStatus>, page: Pagination) -> Result<Paginated<Transaction>> {
        let (items, total) = self.transactions.list(status, page).await?;
        Ok(Paginated::new(items, total, page))
    }
}
