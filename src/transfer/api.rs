//! Transfer API Layer
//!
//! Boundary validation for transfer requests arriving over HTTP. Identities
//! and amounts are checked here before the engine sees them; the engine
//! re-checks amount and same-account on its own.

use axum::http::StatusCode;
use serde::Deserialize;
use tracing::warn;

use super::engine::TransferEngine;
use super::error::TransferError;
use super::types::{TransferRequest, TransferResult};
use crate::account::AccountIdentity;
use crate::account::validation::validate_identity;
use crate::gateway::types::ApiResponse;
use crate::money;

// ============================================================================
// API Request Types
// ============================================================================

/// Transfer request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferApiRequest {
    pub source_account: AccountIdentity,
    pub target_account: AccountIdentity,
    /// Amount as string (to avoid float precision issues)
    pub amount: String,
    #[serde(default)]
    pub reference: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl TransferApiRequest {
    /// Validate identities and amount, producing an engine request.
    pub fn into_request(self) -> Result<TransferRequest, TransferError> {
        let source = validate_identity(&self.source_account)?;
        let target = validate_identity(&self.target_account)?;
        let amount = money::parse_amount(&self.amount)?;

        let request = TransferRequest::new(source, target, amount).with_reference(self.reference);

        Ok(match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => request.with_geo(latitude, longitude),
            (None, None) => request,
            (latitude, longitude) => {
                warn!(?latitude, ?longitude, "Partial geolocation dropped");
                request
            }
        })
    }
}

// ============================================================================
// Error Codes
// ============================================================================

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_PARAMETER: i32 = -1001;
    pub const INVALID_AMOUNT: i32 = -1002;
    pub const SAME_ACCOUNT: i32 = -1004;
    pub const INSUFFICIENT_FUNDS: i32 = -2001;
    pub const ACCOUNT_NOT_FOUND: i32 = -2002;
    pub const AMBIGUOUS_ACCOUNT: i32 = -2003;
    pub const CONCURRENCY_CONFLICT: i32 = -3002;
    pub const SERVICE_UNAVAILABLE: i32 = -5001;
    pub const PERSISTENCE_ERROR: i32 = -5002;
}

/// Map TransferError to (StatusCode, error_code, message)
pub fn map_error(e: &TransferError) -> (StatusCode, i32, String) {
    let status =
        StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let code = match e {
        TransferError::InvalidAccountIdentity(_) => error_codes::INVALID_PARAMETER,
        TransferError::InvalidAmount => error_codes::INVALID_AMOUNT,
        TransferError::SameAccount => error_codes::SAME_ACCOUNT,
        TransferError::InsufficientFunds { .. } => error_codes::INSUFFICIENT_FUNDS,
        TransferError::AccountNotFound(_) => error_codes::ACCOUNT_NOT_FOUND,
        TransferError::AmbiguousAccount(_) => error_codes::AMBIGUOUS_ACCOUNT,
        TransferError::ConcurrencyConflict { .. } => error_codes::CONCURRENCY_CONFLICT,
        TransferError::Persistence(_) => error_codes::PERSISTENCE_ERROR,
    };

    (status, code, e.to_string())
}

// ============================================================================
// Handler
// ============================================================================

/// Validate and execute a transfer.
pub async fn make_transfer(engine: &TransferEngine, req: TransferApiRequest) -> TransferResult {
    let request = req.into_request().inspect_err(|e| {
        warn!(code = e.code(), reason = %e, "Transfer request rejected at boundary");
    })?;

    engine.transfer(request).await
}

/// Legacy response shape: `data` is `true` only on success, `code` says why.
pub fn to_response(result: &TransferResult) -> (StatusCode, ApiResponse<bool>) {
    match result {
        Ok(_) => (
            StatusCode::OK,
            ApiResponse::with_data(error_codes::SUCCESS, "ok", true),
        ),
        Err(e) => {
            let (status, code, msg) = map_error(e);
            (status, ApiResponse::with_data(code, msg, false))
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
