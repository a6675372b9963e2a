use sea_orm_migration::prelude::*;

use super::{date_column, id_column, index_on};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ListingLog::Table)
                    .col(&mut id_column(ListingLog::Id))
                    .col(ColumnDef::new(ListingLog::AccountId).integer().null())
                    .col(ColumnDef::new(ListingLog::MarketplaceId).integer().null())
                    .col(ColumnDef::new(ListingLog::ListingId).integer().null())
                    .col(ColumnDef::new(ListingLog::ListingTitle).string_len(255).null())
                    .col(ColumnDef::new(ListingLog::ProductId).integer().null())
                    .col(ColumnDef::new(ListingLog::ProductTitle).string_len(255).null())
                    .col(ColumnDef::new(ListingLog::ListingProductId).integer().null())
                    .col(ColumnDef::new(ListingLog::ParentListingProductId).integer().null())
                    .col(ColumnDef::new(ListingLog::Component).string_len(16).not_null())
                    .col(ColumnDef::new(ListingLog::ActionId).integer().null())
                    .col(ColumnDef::new(ListingLog::Action).string_len(64).not_null())
                    .col(ColumnDef::new(ListingLog::Initiator).string_len(16).not_null())
                    .col(ColumnDef::new(ListingLog::Type).string_len(16).not_null())
                    .col(ColumnDef::new(ListingLog::Description).text().not_null())
                    .col(ColumnDef::new(ListingLog::AdditionalData).json().null())
                    .col(&mut date_column(ListingLog::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_listing_log_create_date",
                ListingLog::Table,
                [ListingLog::CreateDate],
                false,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_listing_log_listing_product_id",
                ListingLog::Table,
                [ListingLog::ListingProductId],
                false,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_listing_log_action_id",
                ListingLog::Table,
                [ListingLog::ActionId],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderLog::Table)
                    .col(&mut id_column(OrderLog::Id))
                    .col(ColumnDef::new(OrderLog::AccountId).integer().null())
                    .col(ColumnDef::new(OrderLog::MarketplaceId).integer().null())
                    .col(ColumnDef::new(OrderLog::OrderId).integer().null())
                    .col(ColumnDef::new(OrderLog::Component).string_len(16).not_null())
                    .col(ColumnDef::new(OrderLog::Initiator).string_len(16).not_null())
                    .col(ColumnDef::new(OrderLog::Type).string_len(16).not_null())
                    .col(ColumnDef::new(OrderLog::Description).text().not_null())
                    .col(ColumnDef::new(OrderLog::AdditionalData).json().null())
                    .col(&mut date_column(OrderLog::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_order_log_create_date",
                OrderLog::Table,
                [OrderLog::CreateDate],
                false,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_order_log_order_id",
                OrderLog::Table,
                [OrderLog::OrderId],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SynchronizationLog::Table)
                    .col(&mut id_column(SynchronizationLog::Id))
                    .col(ColumnDef::new(SynchronizationLog::OperationHistoryId).integer().null())
                    .col(ColumnDef::new(SynchronizationLog::Task).string_len(255).null())
                    .col(ColumnDef::new(SynchronizationLog::Initiator).string_len(16).not_null())
                    .col(ColumnDef::new(SynchronizationLog::Type).string_len(16).not_null())
                    .col(ColumnDef::new(SynchronizationLog::Description).text().not_null())
                    .col(ColumnDef::new(SynchronizationLog::DetailedDescription).text().null())
                    .col(ColumnDef::new(SynchronizationLog::AdditionalData).json().null())
                    .col(&mut date_column(SynchronizationLog::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_synchronization_log_create_date",
                SynchronizationLog::Table,
                [SynchronizationLog::CreateDate],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SystemLog::Table)
                    .col(&mut id_column(SystemLog::Id))
                    .col(ColumnDef::new(SystemLog::Class).string_len(255).not_null())
                    .col(ColumnDef::new(SystemLog::Type).string_len(16).not_null())
                    .col(ColumnDef::new(SystemLog::Description).text().not_null())
                    .col(ColumnDef::new(SystemLog::DetailedDescription).text().null())
                    .col(ColumnDef::new(SystemLog::AdditionalData).json().null())
                    .col(
                        ColumnDef::new(SystemLog::UpdateDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(&mut date_column(SystemLog::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_system_log_create_date",
                SystemLog::Table,
                [SystemLog::CreateDate],
                false,
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SystemLog::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SynchronizationLog::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderLog::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ListingLog::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ListingLog {
    #[sea_orm(iden = "m2epro_listing_log")]
    Table,
    Id,
    AccountId,
    MarketplaceId,
    ListingId,
    ListingTitle,
    ProductId,
    ProductTitle,
    ListingProductId,
    ParentListingProductId,
    Component,
    ActionId,
    Action,
    Initiator,
    Type,
    Description,
    AdditionalData,
    CreateDate,
}

#[derive(DeriveIden)]
enum OrderLog {
    #[sea_orm(iden = "m2epro_order_log")]
    Table,
    Id,
    AccountId,
    MarketplaceId,
    OrderId,
    Component,
    Initiator,
    Type,
    Description,
    AdditionalData,
    CreateDate,
}

#[derive(DeriveIden)]
enum SynchronizationLog {
    #[sea_orm(iden = "m2epro_synchronization_log")]
    Table,
    Id,
    OperationHistoryId,
    Task,
    Initiator,
    Type,
    Description,
    DetailedDescription,
    AdditionalData,
    CreateDate,
}

#[derive(DeriveIden)]
enum SystemLog {
    #[sea_orm(iden = "m2epro_system_log")]
    Table,
    Id,
    Class,
    Type,
    Description,
    DetailedDescription,
    AdditionalData,
    UpdateDate,
    CreateDate,
}
