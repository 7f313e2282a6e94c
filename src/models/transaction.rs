//! Transaction model for the payment stub

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

text_enum! {
    TransactionKind {
        Donation => "donation",
        Membership => "membership",
        EventFee => "event_fee",
    }
}

text_enum! {
    TransactionStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl TransactionStatus {
    /// Only pending payments can settle; settled ones are final
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        *self == TransactionStatus::Pending && next != TransactionStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    /// Amount in minor currency units (paise, cents)
    pub amount: i64,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub kind: TransactionKind,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub provider: String,
    pub provider_ref: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub amount: i64,
    pub kind: TransactionKind,
    pub currency: Option<String>,
    pub note: Option<String>,
}
