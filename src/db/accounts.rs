//! Account store: locked reads and version-gated writes.
//!
//! The mutating helpers take the enclosing `sqlx` transaction so the row
//! lock taken by `lock_for_update` is held until that unit of work commits
//! or rolls back.

use bigdecimal::BigDecimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::Account;

const ACCOUNT_COLUMNS: &str = "id, account_number, balance, version, created_at, updated_at";

/// Reads an account under an exclusive row lock. Blocks while another unit
/// of work holds the lock on the same row. `None` means not found.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    account_id: i64,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
    ))
    .bind(account_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Applies a balance delta only if the stored version still matches
/// `expected_version`, bumping the version by one. Zero rows affected
/// (`None`) is the canonical conflict signal; under correct locking it
/// should not fire, but it is the invariant check that turns a lost update
/// into a detectable, retryable failure.
pub async fn conditional_apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    account_id: i64,
    delta: &BigDecimal,
    expected_version: i64,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        UPDATE accounts
        SET balance = balance + $1, version = version + 1, updated_at = NOW()
        WHERE id = $2 AND version = $3
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(delta)
    .bind(account_id)
    .bind(expected_version)
    .fetch_optional(&mut **tx)
    .await
}

/// Unlocked point read, for balance inquiries outside a mutating unit of
/// work.
pub async fn fetch(pool: &PgPool, account_id: i64) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
    ))
    .bind(account_id)
    .fetch_optional(pool)
    .await
}
