//! Per-account lock table
//!
//! One `tokio::sync::Mutex` per account, created on first use. Callers that
//! need several accounts must go through [`AccountLocks::acquire`], which
//! takes them in ascending id order.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::account::AccountId;

#[derive(Default)]
pub struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: AccountId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Lock every account in `ids`, duplicates collapsed. Guards are
    /// returned in acquisition order and release on drop.
    pub async fn acquire(&self, ids: &[AccountId]) -> Vec<OwnedMutexGuard<()>> {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for id in ordered {
            // The DashMap shard guard is released before awaiting
            let lock = self.lock_for(id);
            guards.push(lock.lock_owned().await);
        }
        guards
    }
}
