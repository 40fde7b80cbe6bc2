//! Ledger entry lifecycle and history queries.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{status, LedgerEntry, Operation};

const ENTRY_COLUMNS: &str = "id, source_account_id, destination_account_id, amount, kind, \
                             status, description, created_at, completed_at";

/// Inserts the ledger entry for `op` in `pending` status, inside the same
/// unit of work as the balance mutation it records.
pub async fn insert_pending(
    tx: &mut Transaction<'_, Postgres>,
    op: &Operation,
) -> Result<LedgerEntry, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(&format!(
        r#"
        INSERT INTO transactions (
            id, source_account_id, destination_account_id, amount, kind, status,
            description, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING {ENTRY_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(op.source_account_id)
    .bind(op.destination_account_id)
    .bind(&op.amount)
    .bind(op.kind.as_str())
    .bind(status::PENDING)
    .bind(&op.description)
    .fetch_one(&mut **tx)
    .await
}

/// Flips a pending entry to `completed`. Called only after every balance
/// write in the unit of work has been accepted under version gating.
pub async fn mark_completed(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE transactions SET status = $1, completed_at = NOW() WHERE id = $2")
        .bind(status::COMPLETED)
        .bind(entry_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Entries touching `account_id` as source or destination, newest first.
pub async fn history(
    pool: &PgPool,
    account_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(&format!(
        r#"
        SELECT {ENTRY_COLUMNS}
        FROM transactions
        WHERE source_account_id = $1 OR destination_account_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(account_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
