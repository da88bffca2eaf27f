//! Sortcode Ledger - Retail Banking Transfer Engine
//!
//! Accounts addressed by sort code and account number, an append-only
//! transaction history, and a transfer engine that keeps balances and
//! history consistent under concurrency and partial failure.
//!
//! # Modules
//!
//! - [`account`] - Account model, identity validation, creation service
//! - [`ledger`] - Immutable transaction records
//! - [`money`] - Amount parsing and formatting (2 decimal places)
//! - [`store`] - Storage traits with in-memory and PostgreSQL backends
//! - [`transfer`] - Transfer engine, compensation, reconciliation worker
//! - [`gateway`] - axum HTTP API
//! - [`db`] - PostgreSQL pool and schema
//! - [`config`] / [`logging`] - YAML configuration and tracing setup

pub mod account;
pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod store;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{Account, AccountId, AccountIdentity, AccountService};
pub use ledger::{Transaction, TransactionId};
pub use store::{LedgerStores, StoreError};
pub use transfer::{
    ReconciliationWorker, SettlementMode, TransferEngine, TransferError, TransferRequest,
};
