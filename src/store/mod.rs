//! Ledger storage seams
//!
//! The transfer engine only talks to storage through the traits in this
//! module. Two backends implement them:
//! - [`memory`]: `DashMap` based, for tests and database-less runs
//! - [`postgres`]: `sqlx` on PostgreSQL
//!
//! # Atomicity
//! `apply_delta` and `apply_delta_if` must be atomic per account: the net
//! effect of concurrent calls equals the sum of their deltas in some serial
//! order, and no reader ever observes a half-applied delta.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::{Account, AccountId, AccountIdentity, NewAccount};
use crate::ledger::{NewTransaction, Transaction};
use crate::transfer::types::{NewReconciliationMarker, ReconciliationMarker};

pub use memory::{MemoryAccountStore, MemoryReconciliationLog, MemoryTransactionLog};
pub use postgres::{PgAccountStore, PgReconciliationLog, PgTransactionLog};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account number {0} matches more than one account")]
    AmbiguousAccount(String),

    #[error("Account identity already exists: {0}")]
    DuplicateIdentity(AccountIdentity),

    #[error("Balance overflow on account {0}")]
    BalanceOverflow(AccountId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Lazy, restartable stream of transactions; each call to
/// [`TransactionLog::list_by_source`] starts a fresh read.
pub type TransactionStream<'a> = BoxStream<'a, Result<Transaction, StoreError>>;

/// Account lookup and balance mutation
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_identity(
        &self,
        sort_code: &str,
        account_number: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Lookup ignoring the sort code.
    ///
    /// Fails with `AmbiguousAccount` when the number exists under more than
    /// one sort code.
    async fn find_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Store a new account with zero balance.
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Atomically add `delta` to the balance and return the new state.
    async fn apply_delta(&self, id: AccountId, delta: Decimal) -> Result<Account, StoreError>;

    /// Like `apply_delta`, but only if the stored version still equals
    /// `expected_version`. `Ok(None)` means the version moved on.
    async fn apply_delta_if(
        &self,
        id: AccountId,
        delta: Decimal,
        expected_version: i64,
    ) -> Result<Option<Account>, StoreError>;
}

/// Append-only transfer history
#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn append(&self, record: NewTransaction) -> Result<Transaction, StoreError>;

    /// Transactions whose source is `account_id`, oldest initiation first.
    fn list_by_source(&self, account_id: AccountId) -> TransactionStream<'_>;
}

/// Durable queue of compensations that could not be applied inline
#[async_trait]
pub trait ReconciliationLog: Send + Sync {
    async fn record(
        &self,
        marker: NewReconciliationMarker,
    ) -> Result<ReconciliationMarker, StoreError>;

    /// Unresolved markers, oldest first, at most `limit`.
    async fn pending(&self, limit: usize) -> Result<Vec<ReconciliationMarker>, StoreError>;

    async fn resolve(&self, marker_id: i64) -> Result<(), StoreError>;
}

/// Drain [`TransactionLog::list_by_source`] into a `Vec`.
pub async fn collect_by_source(
    log: &dyn TransactionLog,
    account_id: AccountId,
) -> Result<Vec<Transaction>, StoreError> {
    log.list_by_source(account_id).try_collect().await
}

/// The three stores a ledger runs on, behind trait objects
#[derive(Clone)]
pub struct LedgerStores {
    pub accounts: Arc<dyn AccountStore>,
    pub transactions: Arc<dyn TransactionLog>,
    pub reconciliation: Arc<dyn ReconciliationLog>,
}

impl LedgerStores {
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(MemoryAccountStore::new()),
            transactions: Arc::new(MemoryTransactionLog::new()),
            reconciliation: Arc::new(MemoryReconciliationLog::new()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            accounts: Arc::new(PgAccountStore::new(pool.clone())),
            transactions: Arc::new(PgTransactionLog::new(pool.clone())),
            reconciliation: Arc::new(PgReconciliationLog::new(pool)),
        }
    }
}
