//! Sortcode Ledger - HTTP entry point
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Config  │───▶│  Stores  │───▶│TransferEngine│───▶│   Gateway    │
//! │  (YAML)  │    │(PG / RAM)│    │ + Recon Wkr  │    │   (axum)     │
//! └──────────┘    └──────────┘    └──────────────┘    └──────────────┘
//! ```

use std::sync::Arc;

use sortcode_ledger::config::AppConfig;
use sortcode_ledger::db::Database;
use sortcode_ledger::gateway::{self, state::AppState};
use sortcode_ledger::store::LedgerStores;
use sortcode_ledger::transfer::{ReconciliationWorker, TransferEngine};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = sortcode_ledger::logging::init_logging(&app_config);

    tracing::info!(env = %env, "Starting sortcode ledger");

    let (stores, db) = match &app_config.postgres_url {
        Some(url) => {
            let db = Arc::new(Database::connect_and_migrate(url).await?);
            (LedgerStores::postgres(db.pool().clone()), Some(db))
        }
        None => {
            tracing::warn!("No postgres_url configured, using in-memory ledger");
            (LedgerStores::in_memory(), None)
        }
    };

    let engine = Arc::new(TransferEngine::with_config(
        stores.clone(),
        &app_config.transfer,
    ));
    tracing::info!(
        settlement = ?engine.settlement(),
        max_conflict_retries = app_config.transfer.max_conflict_retries,
        "Transfer engine ready"
    );

    if app_config.reconciliation.enabled {
        let worker = ReconciliationWorker::from_config(engine.clone(), &app_config.reconciliation);
        tokio::spawn(async move {
            worker.run().await;
        });
    }

    let state = Arc::new(AppState::from_stores(stores, engine, db));

    let gateway_config = &app_config.gateway;
    let port = get_port_override().unwrap_or(gateway_config.port);

    gateway::run_server(&gateway_config.host, port, state).await
}
