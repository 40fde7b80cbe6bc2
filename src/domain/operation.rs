//! Requested money-movement operation and its shape rules.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Transfer,
    Deposit,
    Withdrawal,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Transfer => "transfer",
            OperationKind::Deposit => "deposit",
            OperationKind::Withdrawal => "withdrawal",
        }
    }
}

/// A validated-shape operation is the engine's only input: a transfer names
/// two distinct accounts, a deposit names a destination only, a withdrawal a
/// source only, and the amount is strictly positive.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    pub source_account_id: Option<i64>,
    pub destination_account_id: Option<i64>,
    pub amount: BigDecimal,
    pub description: Option<String>,
}

impl Operation {
    pub fn transfer(source: i64, destination: i64, amount: BigDecimal) -> Self {
        Self {
            kind: OperationKind::Transfer,
            source_account_id: Some(source),
            destination_account_id: Some(destination),
            amount,
            description: None,
        }
    }

    pub fn deposit(destination: i64, amount: BigDecimal) -> Self {
        Self {
            kind: OperationKind::Deposit,
            source_account_id: None,
            destination_account_id: Some(destination),
            amount,
            description: None,
        }
    }

    pub fn withdrawal(source: i64, amount: BigDecimal) -> Self {
        Self {
            kind: OperationKind::Withdrawal,
            source_account_id: Some(source),
            destination_account_id: None,
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Shape validation. Violations are caller bugs and are never retried.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= BigDecimal::from(0) {
            return Err(LedgerError::InvalidOperation(
                "amount must be positive".into(),
            ));
        }

        match self.kind {
            OperationKind::Transfer => {
                match (self.source_account_id, self.destination_account_id) {
                    (Some(source), Some(destination)) if source == destination => {
                        Err(LedgerError::InvalidOperation(
                            "cannot transfer to the same account".into(),
                        ))
                    }
                    (Some(_), Some(_)) => Ok(()),
                    _ => Err(LedgerError::InvalidOperation(
                        "transfer requires both source and destination account ids".into(),
                    )),
                }
            }
            OperationKind::Deposit => {
                match (self.source_account_id, self.destination_account_id) {
                    (None, Some(_)) => Ok(()),
                    (Some(_), _) => Err(LedgerError::InvalidOperation(
                        "deposit must not name a source account".into(),
                    )),
                    (None, None) => Err(LedgerError::InvalidOperation(
                        "deposit requires a destination account id".into(),
                    )),
                }
            }
            OperationKind::Withdrawal => {
                match (self.source_account_id, self.destination_account_id) {
                    (Some(_), None) => Ok(()),
                    (_, Some(_)) => Err(LedgerError::InvalidOperation(
                        "withdrawal must not name a destination account".into(),
                    )),
                    (None, None) => Err(LedgerError::InvalidOperation(
                        "withdrawal requires a source account id".into(),
                    )),
                }
            }
        }
    }

    /// Referenced account ids in canonical (ascending) order. All
    /// operations lock in this order, which rules out circular wait
    /// between two transfers over the same account pair.
    pub fn lock_order(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .source_account_id
            .into_iter()
            .chain(self.destination_account_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Balance deltas to apply, debit before credit.
    pub fn deltas(&self) -> Vec<(i64, BigDecimal)> {
        let mut deltas = Vec::with_capacity(2);
        if let Some(source) = self.source_account_id {
            deltas.push((source, -self.amount.clone()));
        }
        if let Some(destination) = self.destination_account_id {
            deltas.push((destination, self.amount.clone()));
        }
        deltas
    }

    /// The account that must cover `amount`, if any.
    pub fn funding_source(&self) -> Option<i64> {
        self.source_account_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(value: i64) -> BigDecimal {
        BigDecimal::from(value)
    }

    #[test]
    fn valid_transfer_passes() {
        assert!(Operation::transfer(1, 2, amount(10)).validate().is_ok());
    }

    #[test]
    fn transfer_to_self_is_rejected() {
        let err = Operation::transfer(1, 1, amount(10)).validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOperation(_)));
    }

    #[test]
    fn transfer_missing_account_is_rejected() {
        let op = Operation {
            kind: OperationKind::Transfer,
            source_account_id: Some(1),
            destination_account_id: None,
            amount: amount(10),
            description: None,
        };
        assert!(matches!(
            op.validate(),
            Err(LedgerError::InvalidOperation(_))
        ));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        for value in [0, -5] {
            let err = Operation::deposit(1, amount(value)).validate().unwrap_err();
            assert!(matches!(err, LedgerError::InvalidOperation(_)));
        }
    }

    #[test]
    fn deposit_with_source_is_rejected() {
        let op = Operation {
            kind: OperationKind::Deposit,
            source_account_id: Some(1),
            destination_account_id: Some(2),
            amount: amount(10),
            description: None,
        };
        assert!(matches!(
            op.validate(),
            Err(LedgerError::InvalidOperation(_))
        ));
    }

    #[test]
    fn withdrawal_with_destination_is_rejected() {
        let op = Operation {
            kind: OperationKind::Withdrawal,
            source_account_id: Some(1),
            destination_account_id: Some(2),
            amount: amount(10),
            description: None,
        };
        assert!(matches!(
            op.validate(),
            Err(LedgerError::InvalidOperation(_))
        ));
    }

    #[test]
    fn lock_order_is_ascending_regardless_of_direction() {
        assert_eq!(Operation::transfer(9, 3, amount(1)).lock_order(), vec![3, 9]);
        assert_eq!(Operation::transfer(3, 9, amount(1)).lock_order(), vec![3, 9]);
        assert_eq!(Operation::withdrawal(7, amount(1)).lock_order(), vec![7]);
    }

    #[test]
    fn transfer_deltas_debit_source_first() {
        let deltas = Operation::transfer(5, 2, amount(40)).deltas();
        assert_eq!(deltas[0], (5, amount(-40)));
        assert_eq!(deltas[1], (2, amount(40)));
    }

    #[test]
    fn deposit_has_no_funding_source() {
        assert_eq!(Operation::deposit(1, amount(10)).funding_source(), None);
        assert_eq!(
            Operation::withdrawal(4, amount(10)).funding_source(),
            Some(4)
        );
    }
}
