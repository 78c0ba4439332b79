//! # Shopify Webhook Handler
//!
//! Order webhooks are acknowledged immediately and processed in a spawned
//! task. Shopify retries non-2xx deliveries, so processing failures are
//! logged and never surfaced; only missing routing headers are rejected.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde_json::{Value, json};

use crate::delifast::status::ShipmentStatus;
use crate::error::{ApiError, validation_error};
use crate::lifecycle::LifecycleEngine;
use crate::server::AppState;
use crate::shopify::order::Order;

/// Shopify order webhook intake
#[utoipa::path(
    post,
    path = "/webhooks/shopify/orders",
    params(
        ("X-Shopify-Topic" = String, Header, description = "Webhook topic, e.g. orders/create"),
        ("X-Shopify-Shop-Domain" = String, Header, description = "Originating shop domain")
    ),
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 400, description = "Missing routing headers", body = ApiError)
    ),
    tag = "webhooks"
)]
pub async fn shopify_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let topic = required_header(&headers, "X-Shopify-Topic")?;
    let shop_domain = required_header(&headers, "X-Shopify-Shop-Domain")?
        .trim()
        .to_lowercase();

    tracing::info!(topic = %topic, shop = %shop_domain, "received Shopify order webhook");
    metrics::counter!("bridge_webhooks_received_total").increment(1);

    // Acknowledge before doing any lifecycle work; Shopify's delivery
    // timeout is shorter than a partner round trip.
    tokio::spawn(process_order_event(state, topic, shop_domain, body));

    Ok((StatusCode::OK, Json(json!({ "status": "accepted" }))))
}

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            validation_error(
                "Missing required header",
                json!({ name: "Required header is missing" }),
            )
        })
}

async fn process_order_event(state: AppState, topic: String, shop_domain: String, body: Bytes) {
    let order: Order = match serde_json::from_slice(&body) {
        Ok(order) => order,
        Err(err) => {
            tracing::warn!(topic = %topic, shop = %shop_domain, error = %err,
                "webhook body is not a parsable order, dropping");
            return;
        }
    };

    let settings = match state.settings_repo.find_by_shop_domain(&shop_domain).await {
        Ok(Some(settings)) => settings,
        Ok(None) => {
            tracing::debug!(shop = %shop_domain, "no settings for webhook shop, dropping");
            return;
        }
        Err(err) => {
            tracing::error!(shop = %shop_domain, error = %err,
                "settings lookup failed for webhook");
            return;
        }
    };

    match topic.as_str() {
        "orders/cancelled" => {
            // Cancel only if we ever sent this order.
            match state.engine.get_shipment(&settings, order.id).await {
                Ok(row) if row.status != ShipmentStatus::Cancelled.as_str() => {
                    if let Err(err) = state.engine.cancel_order(&settings, order.id).await {
                        tracing::warn!(shop = %shop_domain, order_id = order.id,
                            error = %err, "cancellation from webhook failed");
                    }
                }
                Ok(_) => {}
                Err(crate::error::LifecycleError::ShipmentNotFound { .. }) => {}
                Err(err) => {
                    tracing::warn!(shop = %shop_domain, order_id = order.id,
                        error = %err, "ledger lookup failed for cancellation webhook");
                }
            }
        }
        other => {
            let Some(event) = trigger_event(other) else {
                tracing::debug!(topic = %other, "ignoring unhandled webhook topic");
                return;
            };

            if !LifecycleEngine::should_auto_send(&settings, event) {
                tracing::debug!(shop = %shop_domain, order_id = order.id, event,
                    "auto-send not configured for this event, dropping");
                return;
            }

            if let Err(err) = state.engine.send_order(&settings, &order).await {
                tracing::warn!(shop = %shop_domain, order_id = order.id,
                    error = %err, "auto-send from webhook failed");
            }
        }
    }
}

/// Maps a webhook topic to the auto-send trigger vocabulary.
fn trigger_event(topic: &str) -> Option<&'static str> {
    match topic {
        "orders/create" => Some("created"),
        "orders/paid" => Some("paid"),
        "orders/fulfilled" => Some("fulfilled"),
        _ => None,
    }
}
