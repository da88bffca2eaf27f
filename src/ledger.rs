//! Ledger - Transfer audit records
//!
//! Every completed transfer leaves exactly one immutable [`Transaction`].

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Transaction identifier, assigned by the transaction log on append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub i64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted transfer record
///
/// `target_owner_name` is a snapshot taken when the transfer ran and is
/// never refreshed from the account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: Decimal,
    pub source_account_id: AccountId,
    pub target_account_id: AccountId,
    pub target_owner_name: String,
    pub initiation_date: DateTime<Utc>,
    pub completion_date: DateTime<Utc>,
    pub reference: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Transaction before the log has assigned it an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub source_account_id: AccountId,
    pub target_account_id: AccountId,
    pub target_owner_name: String,
    pub initiation_date: DateTime<Utc>,
    pub completion_date: DateTime<Utc>,
    pub reference: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl NewTransaction {
    pub fn with_id(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            amount: self.amount,
            source_account_id: self.source_account_id,
            target_account_id: self.target_account_id,
            target_owner_name: self.target_owner_name,
            initiation_date: self.initiation_date,
            completion_date: self.completion_date,
            reference: self.reference,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}
