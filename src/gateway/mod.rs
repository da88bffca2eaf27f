//! HTTP Gateway
//!
//! Thin axum layer over [`AccountService`](crate::account::AccountService)
//! and [`TransferEngine`](crate::transfer::TransferEngine). All routes live
//! under `/api/v1`.

pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;

use state::AppState;

/// Build the gateway router
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/accounts", post(handlers::create_account))
        .route("/accounts/lookup", post(handlers::lookup_account))
        .route("/accounts/deposit", post(handlers::deposit))
        .route("/accounts/{account_number}", get(handlers::get_account_by_number))
        .route("/transactions", post(handlers::create_transfer));

    Router::new().nest("/api/v1", api_routes).with_state(state)
}

/// Start HTTP Gateway server
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} (port may already be in use)", addr))?;

    info!(address = %addr, "Gateway listening");

    axum::serve(listener, app)
        .await
        .context("Gateway server error")?;
    Ok(())
}
