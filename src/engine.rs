//! Transaction engine: executes transfers, deposits, and withdrawals as
//! single units of work under row locks and version-gated writes, with
//! bounded retry on detected conflicts.
//!
//! Concurrency strategy, layered:
//! - serializable isolation on every unit of work, so statements the engine
//!   does not explicitly lock still cannot produce phantom anomalies;
//! - `SELECT ... FOR UPDATE` on every referenced account, always in
//!   ascending id order so two transfers over the same pair of accounts in
//!   opposite directions cannot deadlock;
//! - a version-gated `UPDATE` as the invariant check that turns any lost
//!   update into a detectable, retryable conflict instead of silent
//!   corruption.

use std::collections::BTreeMap;
use std::time::Duration;

use sqlx::PgPool;
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use crate::db::{accounts, entries};
use crate::domain::{Account, AccountBalance, LedgerEntry, Operation};
use crate::error::LedgerError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

const BASE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Result of a successful `execute`: the committed ledger entry id and the
/// post-commit balance of every account the operation touched.
#[derive(Debug)]
pub struct ExecuteOutcome {
    pub transaction_id: Uuid,
    pub updated_balances: Vec<AccountBalance>,
}

/// The ledger's single mutating contract, plus the two read projections.
/// Owns an injected pool handle; concurrency correctness is delegated to
/// Postgres locking plus the explicit lock ordering and version gating
/// above. Cheap to clone.
#[derive(Clone)]
pub struct LedgerEngine {
    pool: PgPool,
    base_delay: Duration,
}

impl LedgerEngine {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            base_delay: BASE_RETRY_DELAY,
        }
    }

    /// Overrides the backoff base delay. Tests use this to keep retry waits
    /// short.
    pub fn with_base_delay(pool: PgPool, base_delay: Duration) -> Self {
        Self { pool, base_delay }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Executes `op` with the default retry bound and no deadline.
    pub async fn execute(&self, op: Operation) -> Result<ExecuteOutcome, LedgerError> {
        self.execute_with(op, DEFAULT_MAX_RETRIES, None).await
    }

    /// Executes `op`, retrying internally on conflicts up to `max_retries`
    /// times. `deadline`, when given, bounds the whole call including every
    /// retry and backoff wait; on expiry the in-flight unit of work is
    /// rolled back and the call fails with `Timeout`.
    pub async fn execute_with(
        &self,
        op: Operation,
        max_retries: u32,
        deadline: Option<Duration>,
    ) -> Result<ExecuteOutcome, LedgerError> {
        op.validate()?;

        match deadline {
            None => self.run_with_retries(&op, max_retries).await,
            Some(limit) => match timeout(limit, self.run_with_retries(&op, max_retries)).await {
                Ok(result) => result,
                Err(_) => Err(LedgerError::Timeout),
            },
        }
    }

    /// Entries touching `account_id`, newest first. Read-only; tolerates
    /// concurrently committing writers without locking.
    pub async fn history(
        &self,
        account_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        entries::history(&self.pool, account_id, limit, offset)
            .await
            .map_err(LedgerError::from)
    }

    /// Current balance and version of an account.
    pub async fn balance(&self, account_id: i64) -> Result<Account, LedgerError> {
        accounts::fetch(&self.pool, account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    async fn run_with_retries(
        &self,
        op: &Operation,
        max_retries: u32,
    ) -> Result<ExecuteOutcome, LedgerError> {
        let mut retry = 0u32;
        loop {
            match self.attempt(op).await {
                Err(LedgerError::ConcurrencyConflict) => {
                    if retry >= max_retries {
                        return Err(LedgerError::RetriesExhausted {
                            attempts: max_retries,
                        });
                    }
                    retry += 1;
                    let delay = backoff_delay(self.base_delay, retry);
                    tracing::warn!(
                        retry,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "conflict detected, retrying"
                    );
                    sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// One full unit of work: lock, validate, record, apply, complete,
    /// commit. Every early return rolls the unit back; nothing is ever
    /// partially applied.
    async fn attempt(&self, op: &Operation) -> Result<ExecuteOutcome, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        // Lock every referenced account before any balance reasoning, in
        // canonical ascending-id order.
        let mut locked: BTreeMap<i64, Account> = BTreeMap::new();
        for account_id in op.lock_order() {
            match accounts::lock_for_update(&mut tx, account_id)
                .await
                .map_err(classify)?
            {
                Some(account) => {
                    locked.insert(account_id, account);
                }
                None => {
                    tx.rollback().await.ok();
                    return Err(LedgerError::AccountNotFound(account_id));
                }
            }
        }

        if let Some(source_id) = op.funding_source() {
            let source = &locked[&source_id];
            if source.balance < op.amount {
                let available = source.balance.clone();
                tx.rollback().await.ok();
                return Err(LedgerError::InsufficientBalance {
                    account_id: source_id,
                    available,
                    required: op.amount.clone(),
                });
            }
        }

        let entry = entries::insert_pending(&mut tx, op).await.map_err(classify)?;

        // Apply deltas against the versions observed under the lock. The
        // row lock means these cannot miss in a correct interleaving; a
        // zero-row update is still the conflict signal the retry loop keys
        // on.
        let mut updated_balances = Vec::with_capacity(2);
        for (account_id, delta) in op.deltas() {
            let expected_version = locked[&account_id].version;
            match accounts::conditional_apply_delta(&mut tx, account_id, &delta, expected_version)
                .await
                .map_err(classify)?
            {
                Some(account) => updated_balances.push(AccountBalance::from(account)),
                None => {
                    tx.rollback().await.ok();
                    return Err(LedgerError::ConcurrencyConflict);
                }
            }
        }

        entries::mark_completed(&mut tx, entry.id).await.map_err(classify)?;
        tx.commit().await.map_err(classify)?;

        tracing::info!(
            transaction_id = %entry.id,
            kind = op.kind.as_str(),
            "transaction completed"
        );

        Ok(ExecuteOutcome {
            transaction_id: entry.id,
            updated_balances,
        })
    }
}

/// Exponential backoff before the n-th retry: `2^n * base`. Never applied
/// before the first attempt.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base * 2u32.saturating_pow(retry)
}

/// Maps store errors onto the ledger taxonomy. Postgres serialization
/// failures (40001) and deadlocks (40P01) are transient conflicts the retry
/// loop owns; everything else surfaces as `StoreUnavailable`.
fn classify(err: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(ref db_err) = err {
        if let Some(code) = db_err.code() {
            if matches!(code.as_ref(), "40001" | "40P01") {
                return LedgerError::ConcurrencyConflict;
            }
        }
    }
    LedgerError::StoreUnavailable(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_retry() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(400));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
    }

    #[test]
    fn classify_falls_back_to_store_unavailable() {
        // sqlx database errors cannot be constructed directly; cover the
        // fallback arm here, the 40001 path is exercised by the concurrent
        // integration tests.
        let err = classify(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, LedgerError::StoreUnavailable(_)));
    }
}
