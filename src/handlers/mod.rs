//! # API Handlers
//!
//! HTTP endpoint handlers for the Delifast bridge API.

pub mod jobs;
pub mod shipments;
pub mod webhooks;

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::models::ServiceInfo;
use crate::server::AppState;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe including a database ping
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 503, description = "Database unreachable")
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    match crate::db::health_check(&state.db).await {
        Ok(()) => Ok(Json(json!({ "status": "ok" }))),
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
