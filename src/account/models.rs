//! Data models for bank accounts

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::Transaction;

/// Internal account identifier, assigned by the store at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External address of an account: sort code plus account number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
    pub sort_code: String,
    pub account_number: String,
}

impl AccountIdentity {
    pub fn new(sort_code: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            sort_code: sort_code.into(),
            account_number: account_number.into(),
        }
    }
}

impl fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sort_code, self.account_number)
    }
}

/// Bank account
///
/// Everything except `current_balance` and `version` is immutable after
/// creation. `version` is bumped by every balance mutation and backs the
/// optimistic compare-and-apply in the stores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub sort_code: String,
    pub account_number: String,
    pub bank_name: String,
    pub owner_name: String,
    pub current_balance: Decimal,
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn identity(&self) -> AccountIdentity {
        AccountIdentity::new(self.sort_code.clone(), self.account_number.clone())
    }
}

/// Account fields supplied by the creation path; the store assigns the rest
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub sort_code: String,
    pub account_number: String,
    pub bank_name: String,
    pub owner_name: String,
}

/// Account together with its outgoing transaction history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    #[serde(flatten)]
    pub account: Account,
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        let identity = AccountIdentity::new("12-34-56", "00001234");
        assert_eq!(identity.to_string(), "12-34-56/00001234");
    }

    #[test]
    fn test_identity_json_is_camel_case() {
        let identity: AccountIdentity =
            serde_json::from_str(r#"{"sortCode":"12-34-56","accountNumber":"00001234"}"#).unwrap();
        assert_eq!(identity, AccountIdentity::new("12-34-56", "00001234"));
    }

    #[test]
    fn test_account_id_ordering() {
        assert!(AccountId(1) < AccountId(2));
        assert_eq!(AccountId(7).to_string(), "7");
    }
}
