//! Shipment lifecycle engine.
//!
//! The engine owns every transition a shipment goes through: submission to
//! the partner, temporary-ID issuance when the partner answers without one,
//! status refresh, manual ID correction, and cancellation. Handlers and the
//! reconciliation jobs both drive it; neither touches the ledger directly.

use chrono::{Duration, Utc};
use serde_json::json;

use crate::config::SyncJobConfig;
use crate::delifast::client::{DelifastClient, StatusResult};
use crate::delifast::extract::extract_shipment_id;
use crate::delifast::ids::{generate_temporary_id, is_temporary_id};
use crate::delifast::status::ShipmentStatus;
use crate::error::LifecycleError;
use crate::mapper::prepare_shipment_payload;
use crate::models::{shipment, tenant_settings};
use crate::repositories::shipment::NewShipment;
use crate::repositories::{LogRepository, ShipmentRepository};
use crate::shopify::annotate::OrderAnnotator;
use crate::shopify::order::Order;

/// Orchestrates shipment state transitions for one request or job step.
#[derive(Debug, Clone)]
pub struct LifecycleEngine {
    client: DelifastClient,
    shipments: ShipmentRepository,
    logs: LogRepository,
    annotator: OrderAnnotator,
    sync: SyncJobConfig,
}

impl LifecycleEngine {
    pub fn new(
        client: DelifastClient,
        shipments: ShipmentRepository,
        logs: LogRepository,
        annotator: OrderAnnotator,
        sync: SyncJobConfig,
    ) -> Self {
        Self {
            client,
            shipments,
            logs,
            annotator,
            sync,
        }
    }

    pub fn client(&self) -> &DelifastClient {
        &self.client
    }

    /// Whether an incoming webhook event should trigger an automatic send.
    pub fn should_auto_send(settings: &tenant_settings::Model, event: &str) -> bool {
        settings.mode == "auto" && settings.auto_send_trigger == event
    }

    /// Submits an order to the partner and records the outcome.
    ///
    /// Re-sending an order whose row already carries a shipment ID,
    /// temporary or real, is a no-op returning the existing row: the partner
    /// accepted that shipment once and a second create would duplicate it.
    /// A failed submission leaves no ID, so those rows are retried. When the
    /// partner accepts the shipment but its response carries no usable ID, a
    /// temporary ID is issued and the resolution schedule started.
    pub async fn send_order(
        &self,
        settings: &tenant_settings::Model,
        order: &Order,
    ) -> Result<shipment::Model, LifecycleError> {
        if let Some(existing) = self
            .shipments
            .find_by_order(&settings.id, order.id)
            .await?
            && existing.shipment_id.is_some()
        {
            tracing::info!(shop = %settings.shop_domain, order_id = order.id,
                shipment_id = ?existing.shipment_id, "order already sent, skipping");
            return Ok(existing);
        }

        let order_number = order.display_number();
        let payload = prepare_shipment_payload(settings, order);

        let response = match self.client.create_shipment(settings, &payload).await {
            Ok(response) => response,
            Err(err) => {
                metrics::counter!("bridge_shipments_sent_total", "outcome" => "error")
                    .increment(1);
                self.shipments
                    .upsert(
                        &settings.id,
                        NewShipment {
                            order_id: order.id,
                            order_number: order_number.clone(),
                            shipment_id: None,
                            is_temporary: false,
                            status: ShipmentStatus::Error,
                            status_details: Some(err.to_string()),
                            next_lookup_at: None,
                        },
                    )
                    .await?;
                self.logs
                    .error(
                        &settings.id,
                        "shipment submission failed",
                        Some(json!({ "order_number": order_number, "error": err.to_string() })),
                    )
                    .await;
                tracing::warn!(shop = %settings.shop_domain, order_id = order.id,
                    error = %err, "shipment submission failed");
                return Err(err);
            }
        };

        let row = match extract_shipment_id(&response).filter(|id| !is_temporary_id(id)) {
            Some(shipment_id) => {
                metrics::counter!("bridge_shipments_sent_total", "outcome" => "ok").increment(1);
                self.shipments
                    .upsert(
                        &settings.id,
                        NewShipment {
                            order_id: order.id,
                            order_number: order_number.clone(),
                            shipment_id: Some(shipment_id.clone()),
                            is_temporary: false,
                            status: ShipmentStatus::New,
                            status_details: None,
                            next_lookup_at: None,
                        },
                    )
                    .await?
            }
            None => {
                // Accepted but no ID in the response. Issue a temporary ID
                // and let the resolution job find the real one later.
                let temp_id = generate_temporary_id(&order_number);
                metrics::counter!("bridge_shipments_sent_total", "outcome" => "temporary")
                    .increment(1);
                tracing::info!(shop = %settings.shop_domain, order_id = order.id,
                    temp_id = %temp_id, "partner response carried no shipment ID");
                self.shipments
                    .upsert(
                        &settings.id,
                        NewShipment {
                            order_id: order.id,
                            order_number: order_number.clone(),
                            shipment_id: Some(temp_id),
                            is_temporary: true,
                            status: ShipmentStatus::New,
                            status_details: Some("awaiting partner shipment ID".to_string()),
                            next_lookup_at: Some(
                                Utc::now()
                                    + Duration::minutes(self.sync.initial_lookup_delay_minutes),
                            ),
                        },
                    )
                    .await?
            }
        };

        self.logs
            .info(
                &settings.id,
                "shipment sent",
                Some(json!({
                    "order_number": order_number,
                    "shipment_id": row.shipment_id,
                    "temporary": row.is_temporary,
                })),
            )
            .await;

        self.annotator
            .annotate_order(
                settings,
                order.id,
                ShipmentStatus::New,
                &format!(
                    "Delifast shipment {} created for order {}",
                    row.shipment_id.as_deref().unwrap_or("-"),
                    order_number
                ),
            )
            .await;

        Ok(row)
    }

    /// Fetches the latest partner status for an order and persists it.
    /// Temporary IDs never hit the partner; they report as awaiting
    /// resolution.
    pub async fn refresh_status(
        &self,
        settings: &tenant_settings::Model,
        order_id: i64,
    ) -> Result<(shipment::Model, StatusResult), LifecycleError> {
        let row = self.require_row(settings, order_id).await?;
        let shipment_id = row
            .shipment_id
            .clone()
            .ok_or(LifecycleError::ShipmentNotFound { order_id })?;

        let result = self.client.get_shipment_status(settings, &shipment_id).await?;
        if result.is_temporary {
            return Ok((row, result));
        }

        // Manual refresh persists unconditionally so updated_at always moves.
        let changed = row.status != result.status.as_str();
        let order_id = row.order_id;
        let updated = self
            .shipments
            .update_status(row, result.status, result.details.clone())
            .await?;

        if changed {
            self.note_status_change(settings, order_id, &updated.order_number, &result)
                .await;
        }

        Ok((updated, result))
    }

    /// Persists a status result only when something changed, annotating the
    /// Shopify order on a canonical status transition. Used by the periodic
    /// status sync.
    pub async fn apply_status(
        &self,
        settings: &tenant_settings::Model,
        row: shipment::Model,
        result: &StatusResult,
    ) -> Result<shipment::Model, LifecycleError> {
        let changed = row.status != result.status.as_str();
        if !changed && row.status_details == result.details {
            return Ok(row);
        }

        let order_id = row.order_id;
        let updated = self
            .shipments
            .update_status(row, result.status, result.details.clone())
            .await?;

        if changed {
            self.note_status_change(settings, order_id, &updated.order_number, result)
                .await;
        }

        Ok(updated)
    }

    async fn note_status_change(
        &self,
        settings: &tenant_settings::Model,
        order_id: i64,
        order_number: &str,
        result: &StatusResult,
    ) {
        metrics::counter!("bridge_status_transitions_total",
            "status" => result.status.as_str())
        .increment(1);
        self.logs
            .info(
                &settings.id,
                "shipment status changed",
                Some(json!({
                    "order_number": order_number,
                    "status": result.status.as_str(),
                    "details": result.details,
                })),
            )
            .await;
        self.annotator
            .annotate_order(
                settings,
                order_id,
                result.status,
                &format!("Delifast status: {}", result.status),
            )
            .await;
    }

    /// Replaces the shipment ID from operator input and refreshes the status
    /// under the corrected ID.
    pub async fn update_shipment_id(
        &self,
        settings: &tenant_settings::Model,
        order_id: i64,
        shipment_id: &str,
    ) -> Result<(shipment::Model, StatusResult), LifecycleError> {
        let row = self.require_row(settings, order_id).await?;
        self.shipments
            .set_manual_shipment_id(row, shipment_id)
            .await?;

        self.logs
            .info(
                &settings.id,
                "shipment ID set manually",
                Some(json!({ "order_id": order_id, "shipment_id": shipment_id })),
            )
            .await;

        self.refresh_status(settings, order_id).await
    }

    /// Cancels a shipment at the partner and records the terminal state.
    pub async fn cancel_order(
        &self,
        settings: &tenant_settings::Model,
        order_id: i64,
    ) -> Result<shipment::Model, LifecycleError> {
        let row = self.require_row(settings, order_id).await?;
        let shipment_id = row
            .shipment_id
            .clone()
            .ok_or(LifecycleError::ShipmentNotFound { order_id })?;

        if !row.is_temporary {
            self.client.cancel_shipment(settings, &shipment_id).await?;
        }

        let updated = self
            .shipments
            .update_status(row, ShipmentStatus::Cancelled, None)
            .await?;

        self.logs
            .info(
                &settings.id,
                "shipment cancelled",
                Some(json!({ "order_id": order_id, "shipment_id": shipment_id })),
            )
            .await;
        self.annotator
            .annotate_order(
                settings,
                order_id,
                ShipmentStatus::Cancelled,
                "Delifast shipment cancelled",
            )
            .await;

        Ok(updated)
    }

    /// Fetches the ledger row for an order.
    pub async fn get_shipment(
        &self,
        settings: &tenant_settings::Model,
        order_id: i64,
    ) -> Result<shipment::Model, LifecycleError> {
        self.require_row(settings, order_id).await
    }

    async fn require_row(
        &self,
        settings: &tenant_settings::Model,
        order_id: i64,
    ) -> Result<shipment::Model, LifecycleError> {
        self.shipments
            .find_by_order(&settings.id, order_id)
            .await?
            .ok_or(LifecycleError::ShipmentNotFound { order_id })
    }
}
