//! Shipment ledger entity model
//!
//! One row per (tenant, order): the partner shipment ID (possibly a locally
//! issued temporary ID), the canonical status, and the reconciliation
//! schedule for temp-ID resolution.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Shipment ledger entry, unique per (tenant_id, order_id)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    /// Unique identifier for the ledger row (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning tenant
    pub tenant_id: Uuid,

    /// Shopify numeric order ID
    pub order_id: i64,

    /// Shopify display order number, e.g. "#1001"
    pub order_number: String,

    /// Partner shipment ID, or a locally issued temporary ID
    pub shipment_id: Option<String>,

    /// True while `shipment_id` is a locally issued placeholder
    pub is_temporary: bool,

    /// Canonical status string, validated against the status enum at the
    /// write boundary
    pub status: String,

    /// Free-form status details from the partner, or an operator notice
    pub status_details: Option<String>,

    /// Number of temp-ID lookup attempts performed (monotone, capped)
    pub lookup_attempts: i32,

    /// When the last lookup attempt ran
    pub last_lookup_at: Option<DateTimeWithTimeZone>,

    /// When the next lookup attempt is due; cleared at the attempt cap
    pub next_lookup_at: Option<DateTimeWithTimeZone>,

    /// When the shipment was sent to the partner
    pub sent_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the ledger row was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the ledger row was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant_settings::Entity",
        from = "Column::TenantId",
        to = "super::tenant_settings::Column::Id"
    )]
    TenantSettings,
}

impl Related<super::tenant_settings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TenantSettings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
