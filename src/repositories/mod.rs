//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access with tenant-aware methods.

pub mod log_entry;
pub mod shipment;
pub mod tenant_settings;

pub use log_entry::LogRepository;
pub use shipment::ShipmentRepository;
pub use tenant_settings::SettingsRepository;
