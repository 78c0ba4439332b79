//! Migration to create the log_entries table (write-only audit trail).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LogEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LogEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LogEntries::TenantId).uuid().not_null())
                    .col(
                        ColumnDef::new(LogEntries::Level)
                            .text()
                            .not_null()
                            .default("info"),
                    )
                    .col(ColumnDef::new(LogEntries::Message).text().not_null())
                    .col(ColumnDef::new(LogEntries::Context).json_binary().null())
                    .col(
                        ColumnDef::new(LogEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_log_entries_tenant_created")
                    .table(LogEntries::Table)
                    .col(LogEntries::TenantId)
                    .col(LogEntries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_log_entries_tenant_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(LogEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LogEntries {
    Table,
    Id,
    TenantId,
    Level,
    Message,
    Context,
    CreatedAt,
}
