//! Migration to create the shipments table.
//!
//! The shipment ledger: one row per (tenant, order), tracking the partner
//! shipment ID (possibly temporary), the canonical status, and the
//! lookup/reconciliation schedule.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Shipments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shipments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Shipments::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Shipments::OrderId).big_integer().not_null())
                    .col(ColumnDef::new(Shipments::OrderNumber).text().not_null())
                    .col(ColumnDef::new(Shipments::ShipmentId).text().null())
                    .col(
                        ColumnDef::new(Shipments::IsTemporary)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Shipments::Status)
                            .text()
                            .not_null()
                            .default("new"),
                    )
                    .col(ColumnDef::new(Shipments::StatusDetails).text().null())
                    .col(
                        ColumnDef::new(Shipments::LookupAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Shipments::LastLookupAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Shipments::NextLookupAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Shipments::SentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Shipments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Shipments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shipments_tenant_id")
                            .from(Shipments::Table, Shipments::TenantId)
                            .to(TenantSettings::Table, TenantSettings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One ledger row per order per tenant
        manager
            .create_index(
                Index::create()
                    .name("idx_shipments_tenant_order")
                    .table(Shipments::Table)
                    .col(Shipments::TenantId)
                    .col(Shipments::OrderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shipments_status")
                    .table(Shipments::Table)
                    .col(Shipments::TenantId)
                    .col(Shipments::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shipments_next_lookup_at")
                    .table(Shipments::Table)
                    .col(Shipments::NextLookupAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_shipments_next_lookup_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_shipments_status").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_shipments_tenant_order").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Shipments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Shipments {
    Table,
    Id,
    TenantId,
    OrderId,
    OrderNumber,
    ShipmentId,
    IsTemporary,
    Status,
    StatusDetails,
    LookupAttempts,
    LastLookupAt,
    NextLookupAt,
    SentAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TenantSettings {
    Table,
    Id,
}
