//! # Data Models
//!
//! This module contains all the data models used throughout the Delifast bridge.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod log_entry;
pub mod shipment;
pub mod tenant_settings;

pub use log_entry::Entity as LogEntry;
pub use shipment::Entity as Shipment;
pub use tenant_settings::Entity as TenantSettings;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "delifast-bridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
