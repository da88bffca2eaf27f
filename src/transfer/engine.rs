//! Transfer Engine
//!
//! Drives one transfer from request to a terminal state:
//!
//! ```text
//! resolve accounts → validate → lock (ascending id) → debit (CAS retry)
//!     → credit target (inline mode) → append transaction → COMPLETED
//!                                 ↓ failure
//!                          compensate (LIFO) → REJECTED + Persistence
//! ```
//!
//! Validation rejections happen before any balance is touched. Once the
//! debit is applied, every later failure is compensated; a reversal that
//! cannot be applied is recorded as a reconciliation marker for
//! [`ReconciliationWorker`](super::worker::ReconciliationWorker).

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::error::TransferError;
use super::locks::AccountLocks;
use super::state::TransferState;
use super::types::{
    BalanceAction, NewReconciliationMarker, SettlementMode, TransferId, TransferRequest,
    TransferResult,
};
use crate::account::{Account, AccountId, AccountIdentity};
use crate::config::TransferConfig;
use crate::ledger::NewTransaction;
use crate::money;
use crate::store::{AccountStore, LedgerStores, ReconciliationLog, TransactionLog};

pub struct TransferEngine {
    accounts: Arc<dyn AccountStore>,
    transactions: Arc<dyn TransactionLog>,
    reconciliation: Arc<dyn ReconciliationLog>,
    locks: AccountLocks,
    settlement: SettlementMode,
    max_conflict_retries: u32,
}

impl TransferEngine {
    /// Engine with default tuning: inline settlement, 5 conflict retries
    pub fn new(stores: LedgerStores) -> Self {
        Self::with_config(stores, &TransferConfig::default())
    }

    pub fn with_config(stores: LedgerStores, config: &TransferConfig) -> Self {
        Self {
            accounts: stores.accounts,
            transactions: stores.transactions,
            reconciliation: stores.reconciliation,
            locks: AccountLocks::new(),
            settlement: config.settlement,
            max_conflict_retries: config.max_conflict_retries.max(1),
        }
    }

    pub fn accounts(&self) -> &Arc<dyn AccountStore> {
        &self.accounts
    }

    pub fn transactions(&self) -> &Arc<dyn TransactionLog> {
        &self.transactions
    }

    pub fn reconciliation(&self) -> &Arc<dyn ReconciliationLog> {
        &self.reconciliation
    }

    pub fn settlement(&self) -> SettlementMode {
        self.settlement
    }

    /// Strict residual rule: the balance left after the debit must stay
    /// above zero, so an amount equal to the balance is refused.
    pub fn is_amount_available(amount: Decimal, balance: Decimal) -> bool {
        balance - amount > Decimal::ZERO
    }

    /// Move `req.amount` from `req.source` to `req.target`.
    ///
    /// Not idempotent: two identical calls perform two transfers.
    pub async fn transfer(&self, req: TransferRequest) -> TransferResult {
        let transfer_id = TransferId::new();
        let span = info_span!("transfer", transfer_id = %transfer_id);

        async move {
            info!(
                state = %TransferState::Pending,
                source = %req.source,
                target = %req.target,
                amount = %req.amount,
                "Transfer received"
            );

            let result = self.execute(transfer_id, &req).await;

            match &result {
                Ok(transaction_id) => info!(
                    state = %TransferState::Completed,
                    transaction_id = transaction_id.0,
                    "Transfer completed"
                ),
                Err(e) if e.is_validation() => info!(
                    state = %TransferState::Rejected,
                    code = e.code(),
                    reason = %e,
                    "Transfer rejected"
                ),
                Err(e) => warn!(
                    state = %TransferState::Rejected,
                    code = e.code(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "Transfer failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, transfer_id: TransferId, req: &TransferRequest) -> TransferResult {
        let source = self.resolve(&req.source).await?;
        let target = self.resolve(&req.target).await?;

        if req.amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        let amount = money::normalize(req.amount)?;

        if source.id == target.id {
            return Err(TransferError::SameAccount);
        }

        let lock_ids = match self.settlement {
            SettlementMode::Inline => vec![source.id, target.id],
            SettlementMode::DebitOnly => vec![source.id],
        };
        let _guards = self.locks.acquire(&lock_ids).await;

        let debited = self.debit_source(source.id, amount).await?;
        debug!(
            account_id = %source.id,
            balance = %debited.current_balance,
            "Source debited"
        );

        // Deltas already applied, in application order
        let mut applied: Vec<(AccountId, Decimal)> = vec![(source.id, -amount)];

        if self.settlement == SettlementMode::Inline {
            match self.accounts.apply_delta(target.id, amount).await {
                Ok(credited) => {
                    debug!(
                        account_id = %target.id,
                        balance = %credited.current_balance,
                        "Target credited"
                    );
                    applied.push((target.id, amount));
                }
                Err(e) => {
                    let reason = format!("target credit failed: {}", e);
                    return Err(self.compensate(transfer_id, &applied, reason).await);
                }
            }
        }

        let now = Utc::now();
        let record = NewTransaction {
            amount,
            source_account_id: source.id,
            target_account_id: target.id,
            target_owner_name: target.owner_name.clone(),
            initiation_date: now,
            completion_date: now,
            reference: req.reference.clone(),
            latitude: req.geo.map(|g| g.latitude),
            longitude: req.geo.map(|g| g.longitude),
        };

        match self.transactions.append(record).await {
            Ok(transaction) => Ok(transaction.id),
            Err(e) => {
                let reason = format!("transaction append failed: {}", e);
                Err(self.compensate(transfer_id, &applied, reason).await)
            }
        }
    }

    async fn resolve(&self, identity: &AccountIdentity) -> Result<Account, TransferError> {
        self.accounts
            .find_by_identity(&identity.sort_code, &identity.account_number)
            .await?
            .ok_or_else(|| TransferError::AccountNotFound(identity.to_string()))
    }

    /// Optimistic debit: re-read, check funds, compare-and-apply on version.
    async fn debit_source(&self, id: AccountId, amount: Decimal) -> Result<Account, TransferError> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            let current = self
                .accounts
                .get(id)
                .await?
                .ok_or_else(|| TransferError::AccountNotFound(id.to_string()))?;

            if !Self::is_amount_available(amount, current.current_balance) {
                return Err(TransferError::InsufficientFunds {
                    available: current.current_balance,
                    requested: amount,
                });
            }

            match self
                .accounts
                .apply_delta_if(id, -amount, current.version)
                .await?
            {
                Some(updated) => return Ok(updated),
                None if attempts >= self.max_conflict_retries => {
                    return Err(TransferError::ConcurrencyConflict { attempts });
                }
                None => {
                    debug!(
                        account_id = %id,
                        attempt = attempts,
                        "Version conflict on debit, retrying"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    /// Reverse `applied` newest first. Locks are still held by the caller,
    /// so the store is used directly.
    async fn compensate(
        &self,
        transfer_id: TransferId,
        applied: &[(AccountId, Decimal)],
        reason: String,
    ) -> TransferError {
        warn!(reason = %reason, deltas = applied.len(), "Compensating transfer");

        for &(account_id, delta) in applied.iter().rev() {
            let reversal = -delta;
            match self.accounts.apply_delta(account_id, reversal).await {
                Ok(account) => info!(
                    account_id = %account_id,
                    delta = %reversal,
                    balance = %account.current_balance,
                    "Compensation applied"
                ),
                Err(e) => {
                    error!(
                        account_id = %account_id,
                        delta = %reversal,
                        error = %e,
                        "Compensation failed, recording reconciliation marker"
                    );

                    let marker = NewReconciliationMarker {
                        transfer_id,
                        account_id,
                        delta: reversal,
                        reason: format!("{}; reversal failed: {}", reason, e),
                        created_at: Utc::now(),
                    };

                    if let Err(record_err) = self.reconciliation.record(marker).await {
                        error!(
                            account_id = %account_id,
                            delta = %reversal,
                            error = %record_err,
                            "CRITICAL: reconciliation marker lost, manual correction required"
                        );
                    }
                }
            }
        }

        TransferError::Persistence(reason)
    }

    /// Apply a positive `amount` to one account under its lock.
    /// Amounts finer than a penny are refused with `InvalidAmount`.
    ///
    /// No funds check: withdrawals here are corrections, not transfers.
    pub async fn update_balance(
        &self,
        account_id: AccountId,
        amount: Decimal,
        action: BalanceAction,
    ) -> Result<Account, TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        let amount = money::normalize(amount)?;

        let _guards = self.locks.acquire(&[account_id]).await;
        let account = self
            .accounts
            .apply_delta(account_id, action.signed(amount))
            .await?;

        debug!(
            account_id = %account_id,
            action = %action,
            amount = %amount,
            balance = %account.current_balance,
            "Balance updated"
        );
        Ok(account)
    }

    /// Fund an account from outside the ledger.
    pub async fn deposit(
        &self,
        identity: &AccountIdentity,
        amount: Decimal,
    ) -> Result<Account, TransferError> {
        let account = self.resolve(identity).await?;
        let updated = self
            .update_balance(account.id, amount, BalanceAction::Deposit)
            .await?;
        info!(account = %identity, amount = %amount, "Deposit applied");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::NewAccount;

    async fn engine_with_account(balance: Decimal) -> (TransferEngine, Account) {
        let engine = TransferEngine::new(LedgerStores::in_memory());
        let account = engine
            .accounts()
            .insert(NewAccount {
                sort_code: "10-20-30".to_string(),
                account_number: "12345678".to_string(),
                bank_name: "Test Bank".to_string(),
                owner_name: "Alice".to_string(),
            })
            .await
            .unwrap();
        if balance > Decimal::ZERO {
            engine
                .update_balance(account.id, balance, BalanceAction::Deposit)
                .await
                .unwrap();
        }
        (engine, account)
    }

    #[test]
    fn test_is_amount_available_is_strict() {
        let balance = Decimal::new(10000, 2);
        assert!(TransferEngine::is_amount_available(Decimal::new(9999, 2), balance));
        assert!(!TransferEngine::is_amount_available(balance, balance));
        assert!(!TransferEngine::is_amount_available(Decimal::new(10001, 2), balance));
    }

    #[tokio::test]
    async fn test_update_balance_both_directions() {
        let (engine, account) = engine_with_account(Decimal::new(100, 0)).await;

        let after = engine
            .update_balance(account.id, Decimal::new(30, 0), BalanceAction::Withdraw)
            .await
            .unwrap();
        assert_eq!(after.current_balance, Decimal::new(70, 0));

        let after = engine
            .update_balance(account.id, Decimal::new(5, 0), BalanceAction::Deposit)
            .await
            .unwrap();
        assert_eq!(after.current_balance, Decimal::new(75, 0));
    }

    #[tokio::test]
    async fn test_update_balance_rejects_non_positive() {
        let (engine, account) = engine_with_account(Decimal::ZERO).await;
        assert_eq!(
            engine
                .update_balance(account.id, Decimal::ZERO, BalanceAction::Deposit)
                .await,
            Err(TransferError::InvalidAmount)
        );
        assert_eq!(
            engine
                .update_balance(account.id, Decimal::new(-1, 0), BalanceAction::Deposit)
                .await,
            Err(TransferError::InvalidAmount)
        );
    }

    #[tokio::test]
    async fn test_update_balance_missing_account() {
        let engine = TransferEngine::new(LedgerStores::in_memory());
        assert_eq!(
            engine
                .update_balance(AccountId(42), Decimal::ONE, BalanceAction::Deposit)
                .await,
            Err(TransferError::AccountNotFound("42".to_string()))
        );
    }

    #[tokio::test]
    async fn test_deposit_by_identity() {
        let (engine, account) = engine_with_account(Decimal::ZERO).await;

        let funded = engine
            .deposit(&account.identity(), Decimal::new(2550, 2))
            .await
            .unwrap();
        assert_eq!(funded.current_balance, Decimal::new(2550, 2));

        let missing = AccountIdentity::new("99-99-99", "00000000");
        assert!(matches!(
            engine.deposit(&missing, Decimal::ONE).await,
            Err(TransferError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_with_config() {
        let config = TransferConfig {
            settlement: SettlementMode::DebitOnly,
            max_conflict_retries: 0,
        };
        let engine = TransferEngine::with_config(LedgerStores::in_memory(), &config);
        assert_eq!(engine.settlement(), SettlementMode::DebitOnly);
        assert_eq!(engine.max_conflict_retries, 1);
    }
}
