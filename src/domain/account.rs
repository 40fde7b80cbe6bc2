//! Account entity.
//! Balance and version are only ever mutated through the store's
//! version-gated update; the version counter is the optimistic-concurrency
//! token.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub id: i64,
    pub account_number: String,
    pub balance: BigDecimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post-mutation balance snapshot returned to the caller of `execute`.
#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    pub account_id: i64,
    pub balance: BigDecimal,
    pub version: i64,
}

impl From<Account> for AccountBalance {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.id,
            balance: account.balance,
            version: account.version,
        }
    }
}
