//! Transfer Core Types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::{AccountId, AccountIdentity};
use crate::ledger::TransactionId;

use super::error::TransferError;

/// Outcome of a single transfer call
pub type TransferResult = Result<TransactionId, TransferError>;

/// Correlation id for one transfer attempt - ULID based
///
/// Present in every log line of the attempt and on reconciliation markers.
/// It is not an idempotency key: two identical requests get two ids and
/// execute twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(ulid::Ulid);

impl TransferId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Where the initiating request came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Validated transfer request handed to the engine
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: AccountIdentity,
    pub target: AccountIdentity,
    pub amount: Decimal,
    pub reference: String,
    pub geo: Option<GeoLocation>,
}

impl TransferRequest {
    pub fn new(source: AccountIdentity, target: AccountIdentity, amount: Decimal) -> Self {
        Self {
            source,
            target,
            amount,
            reference: String::new(),
            geo: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn with_geo(mut self, latitude: f64, longitude: f64) -> Self {
        self.geo = Some(GeoLocation {
            latitude,
            longitude,
        });
        self
    }
}

/// Direction of a balance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceAction {
    Withdraw,
    Deposit,
}

impl BalanceAction {
    /// Signed delta for a positive `amount`
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            BalanceAction::Withdraw => -amount,
            BalanceAction::Deposit => amount,
        }
    }

    /// Split a signed delta back into direction and magnitude
    pub fn from_delta(delta: Decimal) -> (Self, Decimal) {
        if delta.is_sign_negative() {
            (BalanceAction::Withdraw, -delta)
        } else {
            (BalanceAction::Deposit, delta)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceAction::Withdraw => "WITHDRAW",
            BalanceAction::Deposit => "DEPOSIT",
        }
    }
}

impl fmt::Display for BalanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happens to the target balance during a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    /// Debit source and credit target in the same locked unit
    Inline,
    /// Debit source only; an external settlement process credits the target
    DebitOnly,
}

/// Compensating delta that still has to be applied to an account
#[derive(Debug, Clone, PartialEq)]
pub struct NewReconciliationMarker {
    pub transfer_id: TransferId,
    pub account_id: AccountId,
    pub delta: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationMarker {
    pub id: i64,
    pub transfer_id: TransferId,
    pub account_id: AccountId,
    pub delta: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl NewReconciliationMarker {
    pub fn with_id(self, id: i64) -> ReconciliationMarker {
        ReconciliationMarker {
            id,
            transfer_id: self.transfer_id,
            account_id: self.account_id,
            delta: self.delta,
            reason: self.reason,
            created_at: self.created_at,
            resolved_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_id_parse_display() {
        let id = TransferId::new();
        let parsed: TransferId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-ulid".parse::<TransferId>().is_err());
    }

    #[test]
    fn test_transfer_ids_are_unique() {
        assert_ne!(TransferId::new(), TransferId::new());
    }

    #[test]
    fn test_balance_action_signed() {
        let amount = Decimal::new(4000, 2);
        assert_eq!(BalanceAction::Withdraw.signed(amount), -amount);
        assert_eq!(BalanceAction::Deposit.signed(amount), amount);
        assert_eq!(
            BalanceAction::from_delta(-amount),
            (BalanceAction::Withdraw, amount)
        );
        assert_eq!(
            BalanceAction::from_delta(amount),
            (BalanceAction::Deposit, amount)
        );
    }

    #[test]
    fn test_settlement_mode_serde() {
        let mode: SettlementMode = serde_yaml::from_str("debit_only").unwrap();
        assert_eq!(mode, SettlementMode::DebitOnly);
        let mode: SettlementMode = serde_yaml::from_str("inline").unwrap();
        assert_eq!(mode, SettlementMode::Inline);
    }

    #[test]
    fn test_request_builder() {
        let req = TransferRequest::new(
            AccountIdentity::new("12-34-56", "00000001"),
            AccountIdentity::new("12-34-56", "00000002"),
            Decimal::new(100, 0),
        )
        .with_reference("rent")
        .with_geo(51.5, -0.12);
        assert_eq!(req.reference, "rent");
        assert_eq!(
            req.geo,
            Some(GeoLocation {
                latitude: 51.5,
                longitude: -0.12
            })
        );
    }
}
