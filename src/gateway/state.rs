use std::sync::Arc;

use crate::account::AccountService;
use crate::db::Database;
use crate::store::LedgerStores;
use crate::transfer::TransferEngine;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TransferEngine>,
    pub accounts: Arc<AccountService>,
    /// PostgreSQL handle for health checks; `None` on the in-memory ledger
    pub db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(
        engine: Arc<TransferEngine>,
        accounts: Arc<AccountService>,
        db: Option<Arc<Database>>,
    ) -> Self {
        Self {
            engine,
            accounts,
            db,
        }
    }

    /// Wire engine and account service onto the same stores
    pub fn from_stores(
        stores: LedgerStores,
        engine: Arc<TransferEngine>,
        db: Option<Arc<Database>>,
    ) -> Self {
        let accounts = Arc::new(AccountService::new(stores.accounts, stores.transactions));
        Self::new(engine, accounts, db)
    }
}
