//! # Shipment API Handlers
//!
//! Manual lifecycle actions: send an order, inspect its ledger row, refresh
//! its status, and correct the shipment ID. All endpoints require operator
//! bearer auth and the `X-Shop-Domain` header.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{OperatorAuth, ShopExtension};
use crate::delifast::ids::is_temporary_id;
use crate::error::{ApiError, validation_error};
use crate::models::{shipment, tenant_settings};
use crate::server::AppState;
use crate::shopify::order::Order;

/// Request body for sending an order to the partner
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendShipmentRequest {
    /// The Shopify order to submit
    pub order: Order,
}

/// Request body for overwriting a shipment ID
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateShipmentIdRequest {
    /// The real partner shipment ID
    pub shipment_id: String,
}

/// Ledger row view returned by the shipment endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentInfo {
    /// Shopify order ID
    pub order_id: i64,
    /// Display order number
    pub order_number: String,
    /// Partner shipment ID, temporary or real
    pub shipment_id: Option<String>,
    /// Whether the ID is a locally issued placeholder
    pub is_temporary: bool,
    /// Canonical status
    pub status: String,
    /// Raw partner status details
    pub status_details: Option<String>,
    /// Temporary-ID resolution attempts consumed
    pub lookup_attempts: i32,
    /// When the shipment was submitted
    pub sent_at: Option<String>,
    /// Last ledger update
    pub updated_at: String,
}

impl From<shipment::Model> for ShipmentInfo {
    fn from(model: shipment::Model) -> Self {
        Self {
            order_id: model.order_id,
            order_number: model.order_number,
            shipment_id: model.shipment_id,
            is_temporary: model.is_temporary,
            status: model.status,
            status_details: model.status_details,
            lookup_attempts: model.lookup_attempts,
            sent_at: model.sent_at.map(|dt| dt.to_rfc3339()),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

async fn require_settings(
    state: &AppState,
    shop_domain: &str,
) -> Result<tenant_settings::Model, ApiError> {
    state
        .settings_repo
        .find_by_shop_domain(shop_domain)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            crate::error::LifecycleError::SettingsMissing(shop_domain.to_string()).into()
        })
}

/// Submit an order to Delifast
#[utoipa::path(
    post,
    path = "/shipments/send",
    security(("bearer_auth" = [])),
    params(crate::auth::ShopDomainHeader),
    request_body = SendShipmentRequest,
    responses(
        (status = 200, description = "Shipment recorded", body = ShipmentInfo),
        (status = 400, description = "Credentials missing or invalid payload", body = ApiError),
        (status = 404, description = "Unknown shop domain", body = ApiError),
        (status = 502, description = "Partner API failure", body = ApiError)
    ),
    tag = "shipments"
)]
pub async fn send_shipment(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    ShopExtension(shop): ShopExtension,
    Json(request): Json<SendShipmentRequest>,
) -> Result<Json<ShipmentInfo>, ApiError> {
    let settings = require_settings(&state, &shop.0).await?;
    let row = state.engine.send_order(&settings, &request.order).await?;
    Ok(Json(row.into()))
}

/// Fetch the ledger row for an order
#[utoipa::path(
    get,
    path = "/shipments/{order_id}",
    security(("bearer_auth" = [])),
    params(
        crate::auth::ShopDomainHeader,
        ("order_id" = i64, Path, description = "Shopify order ID")
    ),
    responses(
        (status = 200, description = "Ledger row", body = ShipmentInfo),
        (status = 404, description = "Unknown shop or order", body = ApiError)
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    ShopExtension(shop): ShopExtension,
    Path(order_id): Path<i64>,
) -> Result<Json<ShipmentInfo>, ApiError> {
    let settings = require_settings(&state, &shop.0).await?;
    let row = state.engine.get_shipment(&settings, order_id).await?;
    Ok(Json(row.into()))
}

/// Refresh the partner status for an order
#[utoipa::path(
    post,
    path = "/shipments/{order_id}/refresh",
    security(("bearer_auth" = [])),
    params(
        crate::auth::ShopDomainHeader,
        ("order_id" = i64, Path, description = "Shopify order ID")
    ),
    responses(
        (status = 200, description = "Refreshed ledger row", body = ShipmentInfo),
        (status = 404, description = "Unknown shop or order", body = ApiError),
        (status = 502, description = "Partner API failure", body = ApiError)
    ),
    tag = "shipments"
)]
pub async fn refresh_shipment(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    ShopExtension(shop): ShopExtension,
    Path(order_id): Path<i64>,
) -> Result<Json<ShipmentInfo>, ApiError> {
    let settings = require_settings(&state, &shop.0).await?;
    let (row, _) = state.engine.refresh_status(&settings, order_id).await?;
    Ok(Json(row.into()))
}

/// Overwrite the shipment ID for an order with operator input
#[utoipa::path(
    put,
    path = "/shipments/{order_id}/shipment-id",
    security(("bearer_auth" = [])),
    params(
        crate::auth::ShopDomainHeader,
        ("order_id" = i64, Path, description = "Shopify order ID")
    ),
    request_body = UpdateShipmentIdRequest,
    responses(
        (status = 200, description = "Corrected ledger row", body = ShipmentInfo),
        (status = 400, description = "Invalid shipment ID", body = ApiError),
        (status = 404, description = "Unknown shop or order", body = ApiError)
    ),
    tag = "shipments"
)]
pub async fn update_shipment_id(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    ShopExtension(shop): ShopExtension,
    Path(order_id): Path<i64>,
    Json(request): Json<UpdateShipmentIdRequest>,
) -> Result<Json<ShipmentInfo>, ApiError> {
    let shipment_id = request.shipment_id.trim();
    if shipment_id.is_empty() {
        return Err(validation_error(
            "Invalid shipment ID",
            serde_json::json!({ "shipment_id": "must not be empty" }),
        ));
    }
    if is_temporary_id(shipment_id) {
        return Err(validation_error(
            "Invalid shipment ID",
            serde_json::json!({ "shipment_id": "must be a real partner ID, not a placeholder" }),
        ));
    }

    let settings = require_settings(&state, &shop.0).await?;
    let (row, _) = state
        .engine
        .update_shipment_id(&settings, order_id, shipment_id)
        .await?;
    Ok(Json(row.into()))
}
