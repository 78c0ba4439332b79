//! Database migrations for the Delifast bridge.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000001_create_tenant_settings;
mod m2025_06_01_000002_create_shipments;
mod m2025_06_01_000003_create_log_entries;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000001_create_tenant_settings::Migration),
            Box::new(m2025_06_01_000002_create_shipments::Migration),
            Box::new(m2025_06_01_000003_create_log_entries::Migration),
        ]
    }
}
