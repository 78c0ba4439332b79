//! Shipment ledger repository
//!
//! Encapsulates SeaORM operations for the shipments table. All status
//! writes go through [`ShipmentStatus`] so the ledger never holds a value
//! outside the canonical vocabulary.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::delifast::status::ShipmentStatus;
use crate::models::shipment::{self, Entity as Shipment};

/// Fields written when a shipment is first recorded or re-recorded.
#[derive(Debug, Clone)]
pub struct NewShipment {
    pub order_id: i64,
    pub order_number: String,
    pub shipment_id: Option<String>,
    pub is_temporary: bool,
    pub status: ShipmentStatus,
    pub status_details: Option<String>,
    pub next_lookup_at: Option<DateTime<Utc>>,
}

/// Repository for shipment ledger database operations
#[derive(Debug, Clone)]
pub struct ShipmentRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ShipmentRepository {
    /// Creates a new ShipmentRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds the ledger row for an order within a tenant scope
    pub async fn find_by_order(
        &self,
        tenant_id: &Uuid,
        order_id: i64,
    ) -> Result<Option<shipment::Model>> {
        Ok(Shipment::find()
            .filter(shipment::Column::TenantId.eq(*tenant_id))
            .filter(shipment::Column::OrderId.eq(order_id))
            .one(&*self.db)
            .await?)
    }

    /// Inserts or overwrites the ledger row for (tenant, order).
    ///
    /// The (tenant_id, order_id) pair is unique; an existing row is updated
    /// in place rather than duplicated.
    pub async fn upsert(&self, tenant_id: &Uuid, new: NewShipment) -> Result<shipment::Model> {
        let now = Utc::now();

        if let Some(existing) = self.find_by_order(tenant_id, new.order_id).await? {
            let mut active: shipment::ActiveModel = existing.into();
            active.order_number = Set(new.order_number);
            active.shipment_id = Set(new.shipment_id);
            active.is_temporary = Set(new.is_temporary);
            active.status = Set(new.status.as_str().to_string());
            active.status_details = Set(new.status_details);
            // A re-recorded shipment starts its lookup schedule from scratch.
            active.lookup_attempts = Set(0);
            active.last_lookup_at = Set(None);
            active.next_lookup_at = Set(new.next_lookup_at.map(Into::into));
            active.sent_at = Set(Some(now.into()));
            active.updated_at = Set(now.into());
            return Ok(active.update(&*self.db).await?);
        }

        let active = shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(*tenant_id),
            order_id: Set(new.order_id),
            order_number: Set(new.order_number),
            shipment_id: Set(new.shipment_id),
            is_temporary: Set(new.is_temporary),
            status: Set(new.status.as_str().to_string()),
            status_details: Set(new.status_details),
            lookup_attempts: Set(0),
            last_lookup_at: Set(None),
            next_lookup_at: Set(new.next_lookup_at.map(Into::into)),
            sent_at: Set(Some(now.into())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(active.insert(&*self.db).await?)
    }

    /// Updates status and details on an existing row.
    pub async fn update_status(
        &self,
        shipment: shipment::Model,
        status: ShipmentStatus,
        details: Option<String>,
    ) -> Result<shipment::Model> {
        let mut active: shipment::ActiveModel = shipment.into();
        active.status = Set(status.as_str().to_string());
        active.status_details = Set(details);
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&*self.db).await?)
    }

    /// Promotes a temporary row to a real partner shipment ID: clears the
    /// temporary flag, resets status to `new`, and stops the lookup schedule.
    pub async fn promote(
        &self,
        shipment: shipment::Model,
        real_shipment_id: &str,
    ) -> Result<shipment::Model> {
        let now = Utc::now();
        let mut active: shipment::ActiveModel = shipment.into();
        active.shipment_id = Set(Some(real_shipment_id.to_string()));
        active.is_temporary = Set(false);
        active.status = Set(ShipmentStatus::New.as_str().to_string());
        active.status_details = Set(None);
        active.lookup_attempts = Set(0);
        active.last_lookup_at = Set(Some(now.into()));
        active.next_lookup_at = Set(None);
        active.updated_at = Set(now.into());
        Ok(active.update(&*self.db).await?)
    }

    /// Records a failed lookup attempt. At `max_attempts` the schedule is
    /// cleared and a manual-intervention notice written; otherwise the next
    /// attempt is scheduled `interval_minutes` out.
    pub async fn record_lookup_miss(
        &self,
        shipment: shipment::Model,
        max_attempts: i32,
        interval_minutes: i64,
    ) -> Result<shipment::Model> {
        let now = Utc::now();
        let attempts = shipment.lookup_attempts + 1;

        let mut active: shipment::ActiveModel = shipment.into();
        active.lookup_attempts = Set(attempts);
        active.last_lookup_at = Set(Some(now.into()));

        if attempts >= max_attempts {
            active.next_lookup_at = Set(None);
            active.status_details = Set(Some(
                "automatic ID resolution exhausted; set the shipment ID manually".to_string(),
            ));
        } else {
            active.next_lookup_at = Set(Some((now + Duration::minutes(interval_minutes)).into()));
        }

        active.updated_at = Set(now.into());
        Ok(active.update(&*self.db).await?)
    }

    /// Overwrites the shipment ID from operator input and fully resets the
    /// reconciliation state.
    pub async fn set_manual_shipment_id(
        &self,
        shipment: shipment::Model,
        shipment_id: &str,
    ) -> Result<shipment::Model> {
        let now = Utc::now();
        let mut active: shipment::ActiveModel = shipment.into();
        active.shipment_id = Set(Some(shipment_id.to_string()));
        active.is_temporary = Set(false);
        active.status = Set(ShipmentStatus::New.as_str().to_string());
        active.status_details = Set(None);
        active.lookup_attempts = Set(0);
        active.last_lookup_at = Set(None);
        active.next_lookup_at = Set(None);
        active.updated_at = Set(now.into());
        Ok(active.update(&*self.db).await?)
    }

    /// Non-temporary rows with a shipment ID whose status is still
    /// in flight, capped at `limit` per tenant.
    pub async fn find_pollable(
        &self,
        tenant_id: &Uuid,
        limit: u64,
    ) -> Result<Vec<shipment::Model>> {
        Ok(Shipment::find()
            .filter(shipment::Column::TenantId.eq(*tenant_id))
            .filter(shipment::Column::IsTemporary.eq(false))
            .filter(shipment::Column::ShipmentId.is_not_null())
            .filter(shipment::Column::Status.is_in([
                ShipmentStatus::New.as_str(),
                ShipmentStatus::InTransit.as_str(),
                ShipmentStatus::NotFound.as_str(),
                ShipmentStatus::Unknown.as_str(),
            ]))
            .order_by_asc(shipment::Column::UpdatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    /// Temporary rows whose next lookup is due and whose attempt budget is
    /// not exhausted. A missing schedule counts as due so a row short of the
    /// cap can never be stranded.
    pub async fn find_due_for_lookup(
        &self,
        tenant_id: &Uuid,
        max_attempts: i32,
    ) -> Result<Vec<shipment::Model>> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        Ok(Shipment::find()
            .filter(shipment::Column::TenantId.eq(*tenant_id))
            .filter(shipment::Column::IsTemporary.eq(true))
            .filter(shipment::Column::LookupAttempts.lt(max_attempts))
            .filter(
                Condition::any()
                    .add(shipment::Column::NextLookupAt.is_null())
                    .add(shipment::Column::NextLookupAt.lte(now)),
            )
            .order_by_asc(shipment::Column::NextLookupAt)
            .all(&*self.db)
            .await?)
    }

    /// Temporary rows still `new` that were sent more than `stale_after_hours`
    /// ago and have exhausted their lookup attempts.
    pub async fn find_stuck(
        &self,
        tenant_id: &Uuid,
        stale_after_hours: i64,
        max_attempts: i32,
    ) -> Result<Vec<shipment::Model>> {
        let cutoff: sea_orm::prelude::DateTimeWithTimeZone =
            (Utc::now() - Duration::hours(stale_after_hours)).into();
        Ok(Shipment::find()
            .filter(shipment::Column::TenantId.eq(*tenant_id))
            .filter(shipment::Column::IsTemporary.eq(true))
            .filter(shipment::Column::Status.eq(ShipmentStatus::New.as_str()))
            .filter(shipment::Column::SentAt.is_not_null())
            .filter(shipment::Column::SentAt.lt(cutoff))
            .filter(shipment::Column::LookupAttempts.gte(max_attempts))
            .all(&*self.db)
            .await?)
    }

    /// Non-temporary `error` rows updated within the retry window, eligible
    /// for the bounded self-healing reset.
    pub async fn find_recent_errors(
        &self,
        tenant_id: &Uuid,
        retry_window_hours: i64,
    ) -> Result<Vec<shipment::Model>> {
        let cutoff: sea_orm::prelude::DateTimeWithTimeZone =
            (Utc::now() - Duration::hours(retry_window_hours)).into();
        Ok(Shipment::find()
            .filter(shipment::Column::TenantId.eq(*tenant_id))
            .filter(shipment::Column::IsTemporary.eq(false))
            .filter(shipment::Column::Status.eq(ShipmentStatus::Error.as_str()))
            .filter(shipment::Column::UpdatedAt.gte(cutoff))
            .all(&*self.db)
            .await?)
    }

    /// Fetches a row by primary key.
    pub async fn get(&self, id: &Uuid) -> Result<shipment::Model> {
        Shipment::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("shipment row {} not found", id))
    }
}
