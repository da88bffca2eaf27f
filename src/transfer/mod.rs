//! Transfer Engine
//!
//! Moves funds between two accounts identified by sort code and account
//! number, leaving one immutable transaction record per completed transfer.
//!
//! # State Machine
//!
//! ```text
//! PENDING → COMPLETED
//!     ↓
//!  REJECTED  (validation failure, or compensated persistence failure)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Strict residual**: a debit never leaves the source at or below zero
//! 2. **Ordered locking**: accounts are locked in ascending id order
//! 3. **Compensate or mark**: every applied delta is either reversed or
//!    recorded as a reconciliation marker when a later step fails
//! 4. **No deduplication**: identical requests execute independently

pub mod api;
pub mod engine;
pub mod error;
pub mod locks;
pub mod state;
pub mod types;
pub mod worker;


// Re-exports for convenience
pub use api::{TransferApiRequest, make_transfer};
pub use engine::TransferEngine;
pub use error::TransferError;
pub use locks::AccountLocks;
pub use state::TransferState;
pub use types::{
    BalanceAction, GeoLocation, ReconciliationMarker, SettlementMode, TransferId, TransferRequest,
    TransferResult,
};
pub use worker::{ReconciliationWorker, WorkerConfig};
