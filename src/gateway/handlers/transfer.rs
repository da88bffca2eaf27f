//! Transfer handler

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::debug;

use super::super::state::AppState;
use super::super::types::ApiResponse;
use crate::transfer::api::{TransferApiRequest, error_codes, make_transfer, to_response};

/// Create transfer endpoint
///
/// POST /api/v1/transactions
///
/// `data` is `true` on success and `false` otherwise; `code` and `msg`
/// carry the rejection reason. An unreadable body is answered in the same
/// shape with `INVALID_PARAMETER`.
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TransferApiRequest>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse<bool>>) {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Malformed transfer body");
            return (
                rejection.status(),
                Json(ApiResponse::with_data(
                    error_codes::INVALID_PARAMETER,
                    rejection.body_text(),
                    false,
                )),
            );
        }
    };

    let result = make_transfer(&state.engine, req).await;
    let (status, body) = to_response(&result);
    (status, Json(body))
}
