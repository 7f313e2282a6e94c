//! Admin dashboard model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub users_by_role: BTreeMap<String, i64>,
    pub content_by_status: BTreeMap<String, i64>,
    pub pending_moderation: i64,
    pub completed_payments: i64,
    /// Sum of completed payment amounts, per currency, in minor units
    pub completed_amounts: BTreeMap<String, i64>,
}
