//! In-memory ledger backend
//!
//! Uses `DashMap` for concurrent access. A balance mutation holds the shard
//! write lock of its account for the whole read-modify-write, so readers
//! see either the old or the new balance, never an intermediate.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::{StreamExt, stream};
use rust_decimal::Decimal;

use super::{AccountStore, ReconciliationLog, StoreError, TransactionLog, TransactionStream};
use crate::account::{Account, AccountId, AccountIdentity, NewAccount};
use crate::ledger::{NewTransaction, Transaction, TransactionId};
use crate::transfer::types::{NewReconciliationMarker, ReconciliationMarker};

// ============================================================================
// Accounts
// ============================================================================

pub struct MemoryAccountStore {
    accounts: DashMap<AccountId, Account>,
    /// Unique index on (sort_code, account_number)
    by_identity: DashMap<AccountIdentity, AccountId>,
    /// Non-unique index on account_number
    by_number: DashMap<String, Vec<AccountId>>,
    next_id: AtomicI64,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            by_identity: DashMap::new(),
            by_number: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_identity(
        &self,
        sort_code: &str,
        account_number: &str,
    ) -> Result<Option<Account>, StoreError> {
        let key = AccountIdentity::new(sort_code, account_number);
        let id = match self.by_identity.get(&key) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn find_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, StoreError> {
        let ids = self
            .by_number
            .get(account_number)
            .map(|ids| ids.clone())
            .unwrap_or_default();

        match ids.as_slice() {
            [] => Ok(None),
            [id] => Ok(self.accounts.get(id).map(|a| a.clone())),
            _ => Err(StoreError::AmbiguousAccount(account_number.to_string())),
        }
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let identity = AccountIdentity::new(&account.sort_code, &account.account_number);

        // The identity entry stays locked until the account row exists, so a
        // concurrent lookup never resolves to a missing id.
        let created = match self.by_identity.entry(identity.clone()) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateIdentity(identity)),
            Entry::Vacant(slot) => {
                let id = AccountId(self.next_id.fetch_add(1, Ordering::SeqCst));
                let created = Account {
                    id,
                    sort_code: account.sort_code,
                    account_number: account.account_number,
                    bank_name: account.bank_name,
                    owner_name: account.owner_name,
                    current_balance: Decimal::new(0, crate::money::MONEY_SCALE),
                    version: 0,
                    created_at: Utc::now(),
                };
                self.accounts.insert(id, created.clone());
                slot.insert(id);
                created
            }
        };

        self.by_number
            .entry(created.account_number.clone())
            .or_default()
            .push(created.id);

        Ok(created)
    }

    async fn apply_delta(&self, id: AccountId, delta: Decimal) -> Result<Account, StoreError> {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(StoreError::AccountNotFound(id))?;

        account.current_balance = account
            .current_balance
            .checked_add(delta)
            .ok_or(StoreError::BalanceOverflow(id))?;
        account.version += 1;
        Ok(account.clone())
    }

    async fn apply_delta_if(
        &self,
        id: AccountId,
        delta: Decimal,
        expected_version: i64,
    ) -> Result<Option<Account>, StoreError> {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(StoreError::AccountNotFound(id))?;

        if account.version != expected_version {
            return Ok(None);
        }

        account.current_balance = account
            .current_balance
            .checked_add(delta)
            .ok_or(StoreError::BalanceOverflow(id))?;
        account.version += 1;
        Ok(Some(account.clone()))
    }
}

// ============================================================================
// Transactions
// ============================================================================

pub struct MemoryTransactionLog {
    by_source: DashMap<AccountId, Vec<Transaction>>,
    next_id: AtomicI64,
}

impl MemoryTransactionLog {
    pub fn new() -> Self {
        Self {
            by_source: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Total number of records across all sources
    pub fn len(&self) -> usize {
        self.by_source.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self, account_id: AccountId) -> Vec<Transaction> {
        let mut records = self
            .by_source
            .get(&account_id)
            .map(|records| records.clone())
            .unwrap_or_default();
        records.sort_by(|a, b| {
            a.initiation_date
                .cmp(&b.initiation_date)
                .then(a.id.cmp(&b.id))
        });
        records
    }
}

impl Default for MemoryTransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionLog for MemoryTransactionLog {
    async fn append(&self, record: NewTransaction) -> Result<Transaction, StoreError> {
        let id = TransactionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let transaction = record.with_id(id);
        self.by_source
            .entry(transaction.source_account_id)
            .or_default()
            .push(transaction.clone());
        Ok(transaction)
    }

    fn list_by_source(&self, account_id: AccountId) -> TransactionStream<'_> {
        // Snapshot on first poll, not on call
        stream::once(async move { self.snapshot(account_id) })
            .flat_map(|records| stream::iter(records.into_iter().map(Ok)))
            .boxed()
    }
}

// ============================================================================
// Reconciliation markers
// ============================================================================

pub struct MemoryReconciliationLog {
    markers: DashMap<i64, ReconciliationMarker>,
    next_id: AtomicI64,
}

impl MemoryReconciliationLog {
    pub fn new() -> Self {
        Self {
            markers: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn get(&self, marker_id: i64) -> Option<ReconciliationMarker> {
        self.markers.get(&marker_id).map(|m| m.clone())
    }
}

impl Default for MemoryReconciliationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReconciliationLog for MemoryReconciliationLog {
    async fn record(
        &self,
        marker: NewReconciliationMarker,
    ) -> Result<ReconciliationMarker, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let marker = marker.with_id(id);
        self.markers.insert(id, marker.clone());
        Ok(marker)
    }

    async fn pending(&self, limit: usize) -> Result<Vec<ReconciliationMarker>, StoreError> {
        let mut pending: Vec<ReconciliationMarker> = self
            .markers
            .iter()
            .filter(|m| m.resolved_at.is_none())
            .map(|m| m.clone())
            .collect();
        pending.sort_by_key(|m| m.id);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn resolve(&self, marker_id: i64) -> Result<(), StoreError> {
        match self.markers.get_mut(&marker_id) {
            Some(mut marker) => {
                marker.resolved_at.get_or_insert_with(Utc::now);
                Ok(())
            }
            None => Err(StoreError::Database(format!(
                "reconciliation marker {} not found",
                marker_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::collect_by_source;
    use crate::transfer::types::TransferId;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_account(sort_code: &str, account_number: &str) -> NewAccount {
        NewAccount {
            sort_code: sort_code.to_string(),
            account_number: account_number.to_string(),
            bank_name: "Bank of Tests".to_string(),
            owner_name: "Ada".to_string(),
        }
    }

    fn record(source: AccountId, target: AccountId, offset_secs: i64) -> NewTransaction {
        let at = Utc::now() + Duration::seconds(offset_secs);
        NewTransaction {
            amount: Decimal::new(100, 2),
            source_account_id: source,
            target_account_id: target,
            target_owner_name: "Bob".to_string(),
            initiation_date: at,
            completion_date: at,
            reference: format!("t{offset_secs}"),
            latitude: None,
            longitude: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = MemoryAccountStore::new();
        let created = store.insert(new_account("11-22-33", "00000001")).await.unwrap();
        assert_eq!(created.current_balance, Decimal::ZERO);
        assert_eq!(created.version, 0);

        let found = store
            .find_by_identity("11-22-33", "00000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert!(
            store
                .find_by_identity("11-22-34", "00000001")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.get(created.id).await.unwrap().unwrap(), created);
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        let store = MemoryAccountStore::new();
        store.insert(new_account("11-22-33", "00000001")).await.unwrap();
        let err = store
            .insert(new_account("11-22-33", "00000001"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentity(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_account_number_ambiguous() {
        let store = MemoryAccountStore::new();
        store.insert(new_account("11-22-33", "00000001")).await.unwrap();
        assert!(
            store
                .find_by_account_number("00000001")
                .await
                .unwrap()
                .is_some()
        );

        store.insert(new_account("44-55-66", "00000001")).await.unwrap();
        assert_eq!(
            store.find_by_account_number("00000001").await,
            Err(StoreError::AmbiguousAccount("00000001".to_string()))
        );
        assert!(
            store
                .find_by_account_number("99999999")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_apply_delta_missing_account() {
        let store = MemoryAccountStore::new();
        assert_eq!(
            store.apply_delta(AccountId(42), Decimal::ONE).await,
            Err(StoreError::AccountNotFound(AccountId(42)))
        );
    }

    #[tokio::test]
    async fn test_apply_delta_if_version_mismatch() {
        let store = MemoryAccountStore::new();
        let account = store.insert(new_account("11-22-33", "00000001")).await.unwrap();

        let updated = store
            .apply_delta_if(account.id, Decimal::TEN, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.current_balance, Decimal::TEN);
        assert_eq!(updated.version, 1);

        // stale version
        assert!(
            store
                .apply_delta_if(account.id, Decimal::TEN, 0)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            store.get(account.id).await.unwrap().unwrap().current_balance,
            Decimal::TEN
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_apply_delta_no_lost_updates() {
        let store = Arc::new(MemoryAccountStore::new());
        let account = store.insert(new_account("11-22-33", "00000001")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..100 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.apply_delta(account.id, Decimal::ONE).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let account = store.get(account.id).await.unwrap().unwrap();
        assert_eq!(account.current_balance, Decimal::new(100, 0));
        assert_eq!(account.version, 100);
    }

    #[tokio::test]
    async fn test_list_by_source_ordered_and_restartable() {
        let log = MemoryTransactionLog::new();
        let (a, b) = (AccountId(1), AccountId(2));

        log.append(record(a, b, 20)).await.unwrap();
        log.append(record(a, b, 0)).await.unwrap();
        log.append(record(b, a, 5)).await.unwrap();
        log.append(record(a, b, 10)).await.unwrap();

        let first = collect_by_source(&log, a).await.unwrap();
        let refs: Vec<&str> = first.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(refs, vec!["t0", "t10", "t20"]);

        let again = collect_by_source(&log, a).await.unwrap();
        assert_eq!(first, again);

        assert!(collect_by_source(&log, AccountId(3)).await.unwrap().is_empty());
        assert_eq!(log.len(), 4);
    }

    #[tokio::test]
    async fn test_list_by_source_is_lazy() {
        let log = MemoryTransactionLog::new();
        let stream = log.list_by_source(AccountId(1));
        log.append(record(AccountId(1), AccountId(2), 0)).await.unwrap();

        let records: Vec<_> = futures::TryStreamExt::try_collect::<Vec<_>>(stream)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_reconciliation_pending_and_resolve() {
        let log = MemoryReconciliationLog::new();
        for delta in [1, 2, 3] {
            log.record(NewReconciliationMarker {
                transfer_id: TransferId::new(),
                account_id: AccountId(1),
                delta: Decimal::new(delta, 0),
                reason: "append failed".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        let pending = log.pending(2).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, 1);

        log.resolve(1).await.unwrap();
        let pending = log.pending(10).await.unwrap();
        assert_eq!(pending.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2, 3]);
        assert!(log.get(1).unwrap().resolved_at.is_some());

        assert!(log.resolve(99).await.is_err());
    }
}
