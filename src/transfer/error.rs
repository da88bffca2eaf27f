//! Transfer Error Types

use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::validation::ValidationError;
use crate::money::MoneyError;
use crate::store::StoreError;

/// Why a transfer did not complete
///
/// Validation variants are rejected before any balance is touched.
/// `Persistence` is only returned after compensation ran.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Source and target account cannot be the same")]
    SameAccount,

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Account number {0} matches more than one account")]
    AmbiguousAccount(String),

    #[error("Invalid account identity: {0}")]
    InvalidAccountIdentity(String),

    // === System Errors ===
    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Concurrent update conflict after {attempts} attempts")]
    ConcurrencyConflict { attempts: u32 },
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::AmbiguousAccount(_) => "AMBIGUOUS_ACCOUNT",
            TransferError::InvalidAccountIdentity(_) => "INVALID_ACCOUNT_IDENTITY",
            TransferError::Persistence(_) => "PERSISTENCE_ERROR",
            TransferError::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount
            | TransferError::SameAccount
            | TransferError::InvalidAccountIdentity(_) => 400,
            TransferError::AccountNotFound(_) => 404,
            TransferError::AmbiguousAccount(_) | TransferError::ConcurrencyConflict { .. } => 409,
            TransferError::InsufficientFunds { .. } => 422,
            TransferError::Persistence(_) => 500,
        }
    }

    /// Terminal caller error; retrying the same request cannot succeed
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            TransferError::Persistence(_) | TransferError::ConcurrencyConflict { .. }
        )
    }

    /// The same request may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::ConcurrencyConflict { .. })
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AccountNotFound(id) => TransferError::AccountNotFound(id.to_string()),
            StoreError::AmbiguousAccount(number) => TransferError::AmbiguousAccount(number),
            other => TransferError::Persistence(other.to_string()),
        }
    }
}

impl From<MoneyError> for TransferError {
    fn from(_: MoneyError) -> Self {
        TransferError::InvalidAmount
    }
}

impl From<ValidationError> for TransferError {
    fn from(e: ValidationError) -> Self {
        TransferError::InvalidAccountIdentity(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::SameAccount.code(), "SAME_ACCOUNT");
        assert_eq!(
            TransferError::InsufficientFunds {
                available: Decimal::ONE,
                requested: Decimal::TWO,
            }
            .code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(
            TransferError::ConcurrencyConflict { attempts: 5 }.code(),
            "CONCURRENCY_CONFLICT"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount.http_status(), 400);
        assert_eq!(TransferError::AccountNotFound("x".into()).http_status(), 404);
        assert_eq!(TransferError::AmbiguousAccount("x".into()).http_status(), 409);
        assert_eq!(
            TransferError::InsufficientFunds {
                available: Decimal::ONE,
                requested: Decimal::TWO,
            }
            .http_status(),
            422
        );
        assert_eq!(TransferError::Persistence("disk".into()).http_status(), 500);
    }

    #[test]
    fn test_classification() {
        assert!(TransferError::SameAccount.is_validation());
        assert!(!TransferError::SameAccount.is_retryable());
        assert!(!TransferError::Persistence("x".into()).is_validation());
        assert!(TransferError::ConcurrencyConflict { attempts: 1 }.is_retryable());
    }

    #[test]
    fn test_from_store_error() {
        assert_eq!(
            TransferError::from(StoreError::AccountNotFound(AccountId(7))),
            TransferError::AccountNotFound("7".to_string())
        );
        assert_eq!(
            TransferError::from(StoreError::AmbiguousAccount("00000001".into())),
            TransferError::AmbiguousAccount("00000001".to_string())
        );
        assert!(matches!(
            TransferError::from(StoreError::Database("boom".into())),
            TransferError::Persistence(_)
        ));
    }

    #[test]
    fn test_display() {
        let err = TransferError::InsufficientFunds {
            available: Decimal::new(10000, 2),
            requested: Decimal::new(10000, 2),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: available 100.00, requested 100.00"
        );
    }
}
