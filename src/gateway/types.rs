//! Gateway request/response types
//!
//! - `ApiResponse<T>`: unified response wrapper `{code, msg, data}`
//! - `ApiError`: handler error that renders as an `ApiResponse`
//! - request DTOs for the account endpoints

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::account::AccountError;
use crate::store::StoreError;
use crate::transfer::TransferError;
use crate::transfer::api::{error_codes, map_error};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: payload; omitted on errors unless the endpoint always returns one
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_data(error_codes::SUCCESS, "ok", data)
    }

    pub fn with_data(code: i32, msg: impl Into<String>, data: T) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_codes::ACCOUNT_NOT_FOUND, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.code, self.msg))).into_response()
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let (status, code, msg) = map_error(&e);
        Self::new(status, code, msg)
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Validation(v) => Self::bad_request(v.to_string()),
            AccountError::Store(StoreError::AmbiguousAccount(number)) => Self::new(
                StatusCode::CONFLICT,
                error_codes::AMBIGUOUS_ACCOUNT,
                format!("Account number {} matches more than one account", number),
            ),
            AccountError::Store(StoreError::AccountNotFound(id)) => {
                Self::not_found(format!("Account not found: {}", id))
            }
            AccountError::Store(other) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::PERSISTENCE_ERROR,
                other.to_string(),
            ),
            e @ AccountError::CodeSpaceExhausted { .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::SERVICE_UNAVAILABLE,
                e.to_string(),
            ),
        }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub bank_name: String,
    pub owner_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLookupRequest {
    pub sort_code: String,
    pub account_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub sort_code: String,
    pub account_number: String,
    /// Amount as string (to avoid float precision issues)
    pub amount: String,
}
