//! Ledger entry entity.
//! Rows are inserted `pending` inside the same database transaction as the
//! balance mutation and flipped to `completed` just before commit. A
//! completed row is never mutated again; corrections are new compensating
//! entries.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub mod status {
    pub const PENDING: &str = "pending";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub source_account_id: Option<i64>,
    pub destination_account_id: Option<i64>,
    pub amount: BigDecimal,
    pub kind: String,
    pub status: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    pub fn is_completed(&self) -> bool {
        self.status == status::COMPLETED
    }
}
