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
                    .table(Order::Table)
                    .col(&mut id_column(Order::Id))
                    .col(ColumnDef::new(Order::AccountId).integer().not_null())
                    .col(ColumnDef::new(Order::MarketplaceId).integer().not_null())
                    .col(ColumnDef::new(Order::Component).string_len(16).not_null())
                    .col(ColumnDef::new(Order::ChannelOrderId).string_len(255).not_null())
                    .col(ColumnDef::new(Order::StoreId).integer().null())
                    .col(ColumnDef::new(Order::BuyerName).string_len(255).null())
                    .col(ColumnDef::new(Order::BuyerEmail).string_len(255).null())
                    .col(ColumnDef::new(Order::Currency).string_len(8).not_null())
                    .col(
                        ColumnDef::new(Order::PaidAmount)
                            .decimal_len(12, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Order::Status).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Order::ReservationState)
                            .string_len(16)
                            .not_null()
                            .default("not_processed"),
                    )
                    .col(
                        ColumnDef::new(Order::ReservationStartDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Order::MagentoOrderId).integer().null())
                    .col(&mut flag_column(Order::MagentoOrderCreationFailure))
                    .col(
                        ColumnDef::new(Order::MagentoOrderCreationFailsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Order::MagentoOrderCreationLatestAttemptDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Order::PurchaseCreateDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Order::AdditionalData).json().null())
                    .col(&mut date_column(Order::UpdateDate))
                    .col(&mut date_column(Order::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_order_account_channel_order",
                Order::Table,
                [Order::AccountId, Order::ChannelOrderId],
                true,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_order_magento_order_id",
                Order::Table,
                [Order::MagentoOrderId],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItem::Table)
                    .col(&mut id_column(OrderItem::Id))
                    .col(ColumnDef::new(OrderItem::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderItem::ChannelItemId).string_len(255).not_null())
                    .col(ColumnDef::new(OrderItem::Sku).string_len(255).null())
                    .col(ColumnDef::new(OrderItem::Title).string_len(255).not_null())
                    .col(
                        ColumnDef::new(OrderItem::QtyPurchased)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrderItem::Price)
                            .decimal_len(12, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrderItem::TaxDetails).json().null())
                    .col(ColumnDef::new(OrderItem::ShippingDetails).json().null())
                    .col(ColumnDef::new(OrderItem::FeeDetails).json().null())
                    .col(ColumnDef::new(OrderItem::ProductId).integer().null())
                    .col(&mut date_column(OrderItem::UpdateDate))
                    .col(&mut date_column(OrderItem::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_order_item_order_channel_item",
                OrderItem::Table,
                [OrderItem::OrderId, OrderItem::ChannelItemId],
                true,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderChange::Table)
                    .col(&mut id_column(OrderChange::Id))
                    .col(ColumnDef::new(OrderChange::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderChange::Component).string_len(16).not_null())
                    .col(ColumnDef::new(OrderChange::Action).string_len(32).not_null())
                    .col(ColumnDef::new(OrderChange::Params).json().not_null())
                    .col(
                        ColumnDef::new(OrderChange::ProcessingAttemptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrderChange::ProcessingAttemptDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(OrderChange::Hash).string_len(64).not_null())
                    .col(&mut date_column(OrderChange::UpdateDate))
                    .col(&mut date_column(OrderChange::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_order_change_hash",
                OrderChange::Table,
                [OrderChange::Hash],
                true,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_order_change_order_id",
                OrderChange::Table,
                [OrderChange::OrderId],
                false,
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderChange::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItem::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Order::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Order {
    #[sea_orm(iden = "m2epro_order")]
    Table,
    Id,
    AccountId,
    MarketplaceId,
    Component,
    ChannelOrderId,
    StoreId,
    BuyerName,
    BuyerEmail,
    Currency,
    PaidAmount,
    Status,
    ReservationState,
    ReservationStartDate,
    MagentoOrderId,
    MagentoOrderCreationFailure,
    MagentoOrderCreationFailsCount,
    MagentoOrderCreationLatestAttemptDate,
    PurchaseCreateDate,
    AdditionalData,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum OrderItem {
    #[sea_orm(iden = "m2epro_order_item")]
    Table,
    Id,
    OrderId,
    ChannelItemId,
    Sku,
    Title,
    QtyPurchased,
    Price,
    TaxDetails,
    ShippingDetails,
    FeeDetails,
    ProductId,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum OrderChange {
    #[sea_orm(iden = "m2epro_order_change")]
    Table,
    Id,
    OrderId,
    Component,
    Action,
    Params,
    ProcessingAttemptCount,
    ProcessingAttemptDate,
    Hash,
    UpdateDate,
    CreateDate,
}
