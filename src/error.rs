use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bigdecimal::BigDecimal;
use serde_json::json;
use thiserror::Error;

/// Terminal classifications of a ledger operation. Transient conflicts are
/// retried inside the engine and only cross this boundary as
/// `RetriesExhausted`.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("account {0} not found")]
    AccountNotFound(i64),

    #[error("insufficient balance on account {account_id}: available {available}, required {required}")]
    InsufficientBalance {
        account_id: i64,
        available: BigDecimal,
        required: BigDecimal,
    },

    #[error("concurrent modification detected")]
    ConcurrencyConflict,

    #[error("transaction failed after {attempts} retries")]
    RetriesExhausted { attempts: u32 },

    #[error("operation deadline exceeded")]
    Timeout,

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

impl LedgerError {
    /// Whether the engine's internal retry loop may re-attempt after this
    /// failure. Everything else is terminal for the current call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyConflict)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::InvalidOperation(_) | LedgerError::InsufficientBalance { .. } => {
                StatusCode::BAD_REQUEST
            }
            LedgerError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::ConcurrencyConflict | LedgerError::RetriesExhausted { .. } => {
                StatusCode::CONFLICT
            }
            LedgerError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            LedgerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Conflicts surfaced at the HTTP boundary are worth re-submitting.
        let retryable = matches!(
            self,
            LedgerError::ConcurrencyConflict | LedgerError::RetriesExhausted { .. }
        );
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "retryable": retryable,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_operation_is_bad_request() {
        let error = LedgerError::InvalidOperation("amount must be positive".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert!(!error.is_retryable());
    }

    #[test]
    fn insufficient_balance_is_bad_request() {
        let error = LedgerError::InsufficientBalance {
            account_id: 1,
            available: BigDecimal::from(10),
            required: BigDecimal::from(50),
        };
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert!(!error.is_retryable());
    }

    #[test]
    fn account_not_found_is_not_found() {
        let error = LedgerError::AccountNotFound(42);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_is_retryable_and_conflict_status() {
        let error = LedgerError::ConcurrencyConflict;
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert!(error.is_retryable());
    }

    #[test]
    fn retries_exhausted_is_terminal_conflict() {
        let error = LedgerError::RetriesExhausted { attempts: 3 };
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert!(!error.is_retryable());
    }

    #[test]
    fn timeout_is_gateway_timeout() {
        assert_eq!(LedgerError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn store_unavailable_is_service_unavailable() {
        let error = LedgerError::StoreUnavailable(sqlx::Error::PoolClosed);
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn retries_exhausted_response_is_marked_retryable() {
        let response = LedgerError::RetriesExhausted { attempts: 3 }.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
