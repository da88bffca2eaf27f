//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;

use super::super::state::AppState;
use super::super::types::ApiResponse;
use crate::transfer::api::error_codes;

/// Health check response data
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    pub timestamp_ms: i64,
}

/// Health check endpoint
///
/// GET /api/v1/health
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms}}
/// - Unhealthy: 503 Service Unavailable + {code, msg: "unavailable"}
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    if let Some(db) = &state.db
        && let Err(e) = db.health_check().await
    {
        tracing::error!(error = %e, "[HEALTH] PostgreSQL ping failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(
                error_codes::SERVICE_UNAVAILABLE,
                "unavailable",
            )),
        );
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthResponse {
            timestamp_ms: Utc::now().timestamp_millis(),
        })),
    )
}
