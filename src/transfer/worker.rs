//! Reconciliation Worker
//!
//! Background worker that applies compensations the engine could not apply
//! inline. Each pending marker is applied through
//! [`TransferEngine::update_balance`] and then resolved.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::engine::TransferEngine;
use super::error::TransferError;
use super::types::BalanceAction;
use crate::config::ReconciliationConfig;

/// Configuration for the reconciliation worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often to scan for pending markers
    pub scan_interval: Duration,
    /// Maximum markers to process per scan
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(30),
            batch_size: 100,
        }
    }
}

impl From<&ReconciliationConfig> for WorkerConfig {
    fn from(config: &ReconciliationConfig) -> Self {
        Self {
            scan_interval: config.scan_interval(),
            batch_size: config.batch_size,
        }
    }
}

pub struct ReconciliationWorker {
    engine: Arc<TransferEngine>,
    config: WorkerConfig,
}

impl ReconciliationWorker {
    pub fn new(engine: Arc<TransferEngine>, config: WorkerConfig) -> Self {
        Self { engine, config }
    }

    pub fn from_config(engine: Arc<TransferEngine>, config: &ReconciliationConfig) -> Self {
        Self::new(engine, WorkerConfig::from(config))
    }

    /// Run the reconciliation loop forever.
    pub async fn run(&self) -> ! {
        info!(
            scan_interval_secs = self.config.scan_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Starting reconciliation worker"
        );

        loop {
            if let Err(e) = self.scan_and_reconcile().await {
                error!(error = %e, "Reconciliation scan failed");
            }

            tokio::time::sleep(self.config.scan_interval).await;
        }
    }

    /// Run a single scan, returning how many markers were resolved.
    pub async fn scan_and_reconcile(&self) -> Result<usize, TransferError> {
        let pending = self
            .engine
            .reconciliation()
            .pending(self.config.batch_size)
            .await?;

        if pending.is_empty() {
            debug!("No pending reconciliation markers");
            return Ok(0);
        }

        info!(count = pending.len(), "Found pending reconciliation markers");

        let mut resolved = 0;

        for marker in &pending {
            let (action, amount) = BalanceAction::from_delta(marker.delta);

            if amount.is_zero() {
                warn!(marker_id = marker.id, "Zero-delta marker, resolving without update");
            } else {
                match self
                    .engine
                    .update_balance(marker.account_id, amount, action)
                    .await
                {
                    Ok(account) => info!(
                        marker_id = marker.id,
                        transfer_id = %marker.transfer_id,
                        account_id = %marker.account_id,
                        action = %action,
                        amount = %amount,
                        balance = %account.current_balance,
                        "Reconciliation delta applied"
                    ),
                    Err(e) => {
                        error!(
                            marker_id = marker.id,
                            transfer_id = %marker.transfer_id,
                            error = %e,
                            "Failed to apply reconciliation delta"
                        );
                        continue;
                    }
                }
            }

            // The delta is applied; a failed resolve would replay it next scan
            if let Err(e) = self.engine.reconciliation().resolve(marker.id).await {
                error!(
                    marker_id = marker.id,
                    transfer_id = %marker.transfer_id,
                    error = %e,
                    "CRITICAL: delta applied but marker not resolved"
                );
                continue;
            }
            resolved += 1;
        }

        if resolved > 0 {
            info!(count = resolved, "Resolved reconciliation markers this scan");
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LedgerStores;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.scan_interval, Duration::from_secs(30));
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_worker_config_from_app_config() {
        let config = WorkerConfig::from(&ReconciliationConfig {
            enabled: true,
            scan_interval_secs: 5,
            batch_size: 10,
        });
        assert_eq!(config.scan_interval, Duration::from_secs(5));
        assert_eq!(config.batch_size, 10);
    }

    #[tokio::test]
    async fn test_scan_with_nothing_pending() {
        let engine = Arc::new(TransferEngine::new(LedgerStores::in_memory()));
        let worker = ReconciliationWorker::new(engine, WorkerConfig::default());
        assert_eq!(worker.scan_and_reconcile().await.unwrap(), 0);
    }
}
