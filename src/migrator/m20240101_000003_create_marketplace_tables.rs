use sea_orm_migration::prelude::*;

use super::{date_column, flag_column, id_column, index_on};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Marketplace::Table)
                    .col(
                        ColumnDef::new(Marketplace::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Marketplace::NativeId).string_len(64).not_null())
                    .col(ColumnDef::new(Marketplace::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Marketplace::Code).string_len(32).not_null())
                    .col(ColumnDef::new(Marketplace::Url).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Marketplace::IsEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Marketplace::Sorder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Marketplace::GroupTitle).string_len(255).not_null())
                    .col(ColumnDef::new(Marketplace::Component).string_len(16).not_null())
                    .col(ColumnDef::new(Marketplace::Currency).string_len(8).not_null())
                    .col(&mut flag_column(Marketplace::IsVat))
                    .col(&mut flag_column(Marketplace::IsTaxTable))
                    .col(&mut flag_column(Marketplace::IsVariations))
                    .col(&mut flag_column(Marketplace::IsMetricMeasurement))
                    .col(&mut date_column(Marketplace::UpdateDate))
                    .col(&mut date_column(Marketplace::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_marketplace_component_native_id",
                Marketplace::Table,
                [Marketplace::Component, Marketplace::NativeId],
                true,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .col(&mut id_column(Account::Id))
                    .col(ColumnDef::new(Account::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Account::Component).string_len(16).not_null())
                    .col(ColumnDef::new(Account::MarketplaceId).integer().not_null())
                    .col(ColumnDef::new(Account::ServerHash).string_len(255).null())
                    .col(ColumnDef::new(Account::UserId).string_len(255).null())
                    .col(ColumnDef::new(Account::Credentials).json().not_null())
                    .col(
                        ColumnDef::new(Account::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Account::TokenExpiredDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Account::OrdersLastSynchronization)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Account::InventoryLastSynchronization)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(&mut date_column(Account::UpdateDate))
                    .col(&mut date_column(Account::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_account_marketplace_id",
                Account::Table,
                [Account::MarketplaceId],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Template::Table)
                    .col(&mut id_column(Template::Id))
                    .col(ColumnDef::new(Template::Nick).string_len(32).not_null())
                    .col(ColumnDef::new(Template::Component).string_len(16).not_null())
                    .col(ColumnDef::new(Template::Title).string_len(255).not_null())
                    .col(&mut flag_column(Template::IsCustomTemplate))
                    .col(ColumnDef::new(Template::Data).json().not_null())
                    .col(&mut date_column(Template::UpdateDate))
                    .col(&mut date_column(Template::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_template_nick_component",
                Template::Table,
                [Template::Nick, Template::Component],
                false,
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Template::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Account::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Marketplace::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Marketplace {
    #[sea_orm(iden = "m2epro_marketplace")]
    Table,
    Id,
    NativeId,
    Title,
    Code,
    Url,
    IsEnabled,
    Sorder,
    GroupTitle,
    Component,
    Currency,
    IsVat,
    IsTaxTable,
    IsVariations,
    IsMetricMeasurement,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum Account {
    #[sea_orm(iden = "m2epro_account")]
    Table,
    Id,
    Title,
    Component,
    MarketplaceId,
    ServerHash,
    UserId,
    Credentials,
    IsActive,
    TokenExpiredDate,
    OrdersLastSynchronization,
    InventoryLastSynchronization,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum Template {
    #[sea_orm(iden = "m2epro_template")]
    Table,
    Id,
    Nick,
    Component,
    Title,
    IsCustomTemplate,
    Data,
    UpdateDate,
    CreateDate,
}
