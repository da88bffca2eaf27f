use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::transfer::SettlementMode;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// PostgreSQL connection URL. In-memory ledger when absent.
    #[serde(default)]
    pub postgres_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Transfer engine tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    /// Whether the target is credited inside the transfer call
    pub settlement: SettlementMode,
    /// Debit attempts before surfacing a concurrency conflict
    pub max_conflict_retries: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            settlement: SettlementMode::Inline,
            max_conflict_retries: 5,
        }
    }
}

/// Reconciliation worker settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReconciliationConfig {
    pub enabled: bool,
    pub scan_interval_secs: u64,
    pub batch_size: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: 30,
            batch_size: 100,
        }
    }
}

impl ReconciliationConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
