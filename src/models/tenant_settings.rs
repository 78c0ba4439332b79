//! Tenant settings entity model
//!
//! One row per Shopify shop: Delifast credentials, delivery mode, sender
//! profile, shipping defaults, and the cached partner bearer token.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Tenant settings entity keyed by unique shop domain
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tenant_settings")]
pub struct Model {
    /// Unique identifier for the tenant (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Shopify shop domain, e.g. "acme.myshopify.com" (unique)
    pub shop_domain: String,

    /// Delifast account username; absent means the tenant is inactive
    pub delifast_username: Option<String>,

    /// AES-GCM-encrypted Delifast password in colon-hex wire format
    pub delifast_password_ciphertext: Option<String>,

    /// Optional partner customer ID included in shipment payloads
    pub delifast_customer_id: Option<String>,

    /// Delivery mode: "auto" or "manual"
    pub mode: String,

    /// Webhook event that triggers auto-send: "created", "paid", or "fulfilled"
    pub auto_send_trigger: String,

    /// Sender profile
    pub sender_name: Option<String>,
    pub sender_address: Option<String>,
    pub sender_mobile: Option<String>,
    pub sender_city_id: Option<i32>,
    pub sender_area_id: Option<i32>,

    /// Shipping defaults
    pub default_weight: f64,
    pub default_length: f64,
    pub default_width: f64,
    pub default_height: f64,
    pub default_city_id: i32,
    pub payment_method_id: i32,
    pub fees_on_sender: bool,
    pub fees_paid: bool,

    /// AES-GCM-encrypted Shopify Admin API token for order annotation
    pub shopify_access_token_ciphertext: Option<String>,

    /// Cached Delifast bearer token
    pub api_token: Option<String>,

    /// Expiry of the cached bearer token
    pub token_expires_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the settings row was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the settings row was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shipment::Entity")]
    Shipment,
}

impl Related<super::shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A tenant is active only when both Delifast credentials are present.
    pub fn has_credentials(&self) -> bool {
        self.delifast_username
            .as_deref()
            .is_some_and(|u| !u.is_empty())
            && self
                .delifast_password_ciphertext
                .as_deref()
                .is_some_and(|p| !p.is_empty())
    }
}
