//! Thin HTTP driver over the ledger contract. Everything here is request
//! shaping and status mapping; all money logic lives in the engine.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{Operation, OperationKind};
use crate::error::LedgerError;
use crate::AppState;

const MAX_HISTORY_LIMIT: i64 = 100;
const DEFAULT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub transaction_type: OperationKind,
    pub from_account_id: Option<i64>,
    pub to_account_id: Option<i64>,
    /// Decimal string, e.g. "100.50". Parsed exactly; no float round-trip.
    pub amount: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let amount: BigDecimal = payload
        .amount
        .parse()
        .map_err(|_| LedgerError::InvalidOperation("amount must be a decimal number".into()))?;

    let description = payload
        .description
        .unwrap_or_else(|| format!("{} transaction", payload.transaction_type.as_str()));

    let op = Operation {
        kind: payload.transaction_type,
        source_account_id: payload.from_account_id,
        destination_account_id: payload.to_account_id,
        amount,
        description: Some(description),
    };

    let outcome = state.engine.execute(op).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "transaction_id": outcome.transaction_id,
            "updated_balances": outcome.updated_balances,
        })),
    ))
}

pub async fn transaction_history(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, LedgerError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(LedgerError::InvalidOperation(format!(
            "limit must be between 1 and {MAX_HISTORY_LIMIT}"
        )));
    }
    let offset = params.offset.unwrap_or(0);
    if offset < 0 {
        return Err(LedgerError::InvalidOperation("offset must be >= 0".into()));
    }

    let entries = state.engine.history(account_id, limit, offset).await?;
    let count = entries.len();

    Ok(Json(json!({
        "transactions": entries,
        "pagination": {
            "limit": limit,
            "offset": offset,
            "count": count,
        },
    })))
}

pub async fn account_balance(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> Result<impl IntoResponse, LedgerError> {
    let account = state.engine.balance(account_id).await?;

    Ok(Json(json!({
        "account_id": account.id,
        "account_number": account.account_number,
        "balance": account.balance,
        "version": account.version,
        "updated_at": account.updated_at,
    })))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({"status": "healthy", "database": "connected"})),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "unhealthy", "database": "disconnected"})),
        ),
    }
}
