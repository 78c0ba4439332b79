//! # Job Trigger Handlers
//!
//! Idempotent POST endpoints that run one reconciliation sweep each,
//! intended for external schedulers. Guarded by operator bearer auth; no
//! shop header is required because every sweep spans all tenants.

use axum::{extract::State, response::Json};

use crate::auth::OperatorAuth;
use crate::error::ApiError;
use crate::jobs::JobSummary;
use crate::server::AppState;

/// Run the status sync sweep once
#[utoipa::path(
    post,
    path = "/jobs/status-sync",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep finished", body = JobSummary),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn trigger_status_sync(
    State(state): State<AppState>,
    _auth: OperatorAuth,
) -> Result<Json<JobSummary>, ApiError> {
    Ok(Json(state.jobs.run_status_sync().await))
}

/// Run the temporary-ID resolution sweep once
#[utoipa::path(
    post,
    path = "/jobs/temp-id-resolution",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep finished", body = JobSummary),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn trigger_temp_id_resolution(
    State(state): State<AppState>,
    _auth: OperatorAuth,
) -> Result<Json<JobSummary>, ApiError> {
    Ok(Json(state.jobs.run_temp_id_resolution().await))
}

/// Run the stuck-order sweep once
#[utoipa::path(
    post,
    path = "/jobs/stuck-orders",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep finished", body = JobSummary),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn trigger_stuck_orders(
    State(state): State<AppState>,
    _auth: OperatorAuth,
) -> Result<Json<JobSummary>, ApiError> {
    Ok(Json(state.jobs.run_stuck_order_sweep().await))
}
