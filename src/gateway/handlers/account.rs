//! Account handlers: creation, lookup and deposit

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use super::super::state::AppState;
use super::super::types::{
    AccountLookupRequest, ApiError, ApiResult, CreateAccountRequest, DepositRequest, created, ok,
};
use crate::account::validation::validate_identity;
use crate::account::{Account, AccountDetails, AccountIdentity};
use crate::money;
use crate::transfer::TransferError;

/// POST /api/v1/accounts
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Account> {
    let account = state
        .accounts
        .create_account(&req.bank_name, &req.owner_name)
        .await?;
    created(account)
}

/// POST /api/v1/accounts/lookup
///
/// Account plus its outgoing transactions in initiation order.
pub async fn lookup_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AccountLookupRequest>,
) -> ApiResult<AccountDetails> {
    let details = state
        .accounts
        .get_account(&req.sort_code, &req.account_number)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "Account not found: {}/{}",
                req.sort_code, req.account_number
            ))
        })?;
    ok(details)
}

/// GET /api/v1/accounts/{account_number}
pub async fn get_account_by_number(
    State(state): State<Arc<AppState>>,
    Path(account_number): Path<String>,
) -> ApiResult<Account> {
    let account = state
        .accounts
        .get_account_by_number(&account_number)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Account not found: {}", account_number)))?;
    ok(account)
}

/// POST /api/v1/accounts/deposit
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<Account> {
    let identity = validate_identity(&AccountIdentity::new(req.sort_code, req.account_number))
        .map_err(TransferError::from)?;
    let amount = money::parse_amount(&req.amount).map_err(TransferError::from)?;

    let account = state.engine.deposit(&identity, amount).await?;
    ok(account)
}
