//! Migration to create the tenant_settings table.
//!
//! One row per Shopify shop: Delifast credentials, sender profile,
//! shipping defaults, and the cached partner bearer token.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TenantSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TenantSettings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TenantSettings::ShopDomain).text().not_null())
                    .col(ColumnDef::new(TenantSettings::DelifastUsername).text().null())
                    .col(
                        ColumnDef::new(TenantSettings::DelifastPasswordCiphertext)
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(TenantSettings::DelifastCustomerId).text().null())
                    .col(
                        ColumnDef::new(TenantSettings::Mode)
                            .text()
                            .not_null()
                            .default("manual"),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::AutoSendTrigger)
                            .text()
                            .not_null()
                            .default("created"),
                    )
                    .col(ColumnDef::new(TenantSettings::SenderName).text().null())
                    .col(ColumnDef::new(TenantSettings::SenderAddress).text().null())
                    .col(ColumnDef::new(TenantSettings::SenderMobile).text().null())
                    .col(ColumnDef::new(TenantSettings::SenderCityId).integer().null())
                    .col(ColumnDef::new(TenantSettings::SenderAreaId).integer().null())
                    .col(
                        ColumnDef::new(TenantSettings::DefaultWeight)
                            .double()
                            .not_null()
                            .default(0.5),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::DefaultLength)
                            .double()
                            .not_null()
                            .default(10.0),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::DefaultWidth)
                            .double()
                            .not_null()
                            .default(10.0),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::DefaultHeight)
                            .double()
                            .not_null()
                            .default(10.0),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::DefaultCityId)
                            .integer()
                            .not_null()
                            .default(13),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::PaymentMethodId)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::FeesOnSender)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::FeesPaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::ShopifyAccessTokenCiphertext)
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(TenantSettings::ApiToken).text().null())
                    .col(
                        ColumnDef::new(TenantSettings::TokenExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TenantSettings::UpdatedAt)
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
                    .name("idx_tenant_settings_shop_domain")
                    .table(TenantSettings::Table)
                    .col(TenantSettings::ShopDomain)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_tenant_settings_shop_domain")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(TenantSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TenantSettings {
    Table,
    Id,
    ShopDomain,
    DelifastUsername,
    DelifastPasswordCiphertext,
    DelifastCustomerId,
    Mode,
    AutoSendTrigger,
    SenderName,
    SenderAddress,
    SenderMobile,
    SenderCityId,
    SenderAreaId,
    DefaultWeight,
    DefaultLength,
    DefaultWidth,
    DefaultHeight,
    DefaultCityId,
    PaymentMethodId,
    FeesOnSender,
    FeesPaid,
    ShopifyAccessTokenCiphertext,
    ApiToken,
    TokenExpiresAt,
    CreatedAt,
    UpdatedAt,
}
