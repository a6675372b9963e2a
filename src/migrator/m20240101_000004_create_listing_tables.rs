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
                    .table(Listing::Table)
                    .col(&mut id_column(Listing::Id))
                    .col(ColumnDef::new(Listing::AccountId).integer().not_null())
                    .col(ColumnDef::new(Listing::MarketplaceId).integer().not_null())
                    .col(ColumnDef::new(Listing::Component).string_len(16).not_null())
                    .col(ColumnDef::new(Listing::Title).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Listing::StoreId)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Listing::TemplateSellingFormatId).integer().null())
                    .col(ColumnDef::new(Listing::TemplateShippingId).integer().null())
                    .col(ColumnDef::new(Listing::TemplateDescriptionId).integer().null())
                    .col(ColumnDef::new(Listing::TemplateSynchronizationId).integer().null())
                    .col(
                        ColumnDef::new(Listing::AutoMode)
                            .string_len(16)
                            .not_null()
                            .default("none"),
                    )
                    .col(&mut flag_column(Listing::AutoGlobalAddingMode))
                    .col(&mut flag_column(Listing::AutoWebsiteAddingMode))
                    .col(ColumnDef::new(Listing::AdditionalData).json().null())
                    .col(&mut date_column(Listing::UpdateDate))
                    .col(&mut date_column(Listing::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_listing_account_id",
                Listing::Table,
                [Listing::AccountId],
                false,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_listing_marketplace_id",
                Listing::Table,
                [Listing::MarketplaceId],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ListingProduct::Table)
                    .col(&mut id_column(ListingProduct::Id))
                    .col(ColumnDef::new(ListingProduct::ListingId).integer().not_null())
                    .col(ColumnDef::new(ListingProduct::ProductId).integer().not_null())
                    .col(ColumnDef::new(ListingProduct::Component).string_len(16).not_null())
                    .col(
                        ColumnDef::new(ListingProduct::Status)
                            .string_len(16)
                            .not_null()
                            .default("not_listed"),
                    )
                    .col(
                        ColumnDef::new(ListingProduct::StatusChanger)
                            .string_len(16)
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(ListingProduct::ItemId).string_len(255).null())
                    .col(ColumnDef::new(ListingProduct::OnlineSku).string_len(255).null())
                    .col(ColumnDef::new(ListingProduct::OnlineTitle).string_len(255).null())
                    .col(ColumnDef::new(ListingProduct::OnlinePrice).decimal_len(12, 4).null())
                    .col(ColumnDef::new(ListingProduct::OnlineQty).integer().null())
                    .col(ColumnDef::new(ListingProduct::OnlineCategory).string_len(255).null())
                    .col(ColumnDef::new(ListingProduct::OnlineDetails).json().null())
                    .col(&mut flag_column(ListingProduct::IsVariationProduct))
                    .col(ColumnDef::new(ListingProduct::TemplateSellingFormatId).integer().null())
                    .col(ColumnDef::new(ListingProduct::TemplateShippingId).integer().null())
                    .col(ColumnDef::new(ListingProduct::TemplateDescriptionId).integer().null())
                    .col(
                        ColumnDef::new(ListingProduct::TemplateSynchronizationId)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ListingProduct::LastBlockingErrorDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ListingProduct::AdditionalData).json().null())
                    .col(&mut date_column(ListingProduct::UpdateDate))
                    .col(&mut date_column(ListingProduct::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_listing_product_listing_product",
                ListingProduct::Table,
                [ListingProduct::ListingId, ListingProduct::ProductId],
                true,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_listing_product_status",
                ListingProduct::Table,
                [ListingProduct::Status],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Variation::Table)
                    .col(&mut id_column(Variation::Id))
                    .col(ColumnDef::new(Variation::ListingProductId).integer().not_null())
                    .col(ColumnDef::new(Variation::OnlineSku).string_len(255).null())
                    .col(ColumnDef::new(Variation::OnlinePrice).decimal_len(12, 4).null())
                    .col(ColumnDef::new(Variation::OnlineQty).integer().null())
                    .col(
                        ColumnDef::new(Variation::Status)
                            .string_len(16)
                            .not_null()
                            .default("not_listed"),
                    )
                    .col(&mut date_column(Variation::UpdateDate))
                    .col(&mut date_column(Variation::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_listing_product_variation_listing_product_id",
                Variation::Table,
                [Variation::ListingProductId],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VariationOption::Table)
                    .col(&mut id_column(VariationOption::Id))
                    .col(
                        ColumnDef::new(VariationOption::ListingProductVariationId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(VariationOption::ProductId).integer().null())
                    .col(ColumnDef::new(VariationOption::Attribute).string_len(255).not_null())
                    .col(ColumnDef::new(VariationOption::OptionValue).string_len(255).not_null())
                    .col(&mut date_column(VariationOption::UpdateDate))
                    .col(&mut date_column(VariationOption::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_listing_product_variation_option_attribute",
                VariationOption::Table,
                [
                    VariationOption::ListingProductVariationId,
                    VariationOption::Attribute,
                ],
                true,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .col(&mut id_column(Tag::Id))
                    .col(ColumnDef::new(Tag::Nick).string_len(255).not_null())
                    .col(ColumnDef::new(Tag::ErrorCode).string_len(100).not_null())
                    .col(ColumnDef::new(Tag::Text).string_len(255).not_null())
                    .col(&mut date_column(Tag::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on("idx_m2epro_tag_nick", Tag::Table, [Tag::Nick], true))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TagRelation::Table)
                    .col(&mut id_column(TagRelation::Id))
                    .col(ColumnDef::new(TagRelation::ListingProductId).integer().not_null())
                    .col(ColumnDef::new(TagRelation::TagId).integer().not_null())
                    .col(&mut date_column(TagRelation::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_listing_product_tag_relation_pair",
                TagRelation::Table,
                [TagRelation::ListingProductId, TagRelation::TagId],
                true,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_listing_product_tag_relation_tag_id",
                TagRelation::Table,
                [TagRelation::TagId],
                false,
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TagRelation::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tag::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VariationOption::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Variation::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ListingProduct::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Listing::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Listing {
    #[sea_orm(iden = "m2epro_listing")]
    Table,
    Id,
    AccountId,
    MarketplaceId,
    Component,
    Title,
    StoreId,
    TemplateSellingFormatId,
    TemplateShippingId,
    TemplateDescriptionId,
    TemplateSynchronizationId,
    AutoMode,
    AutoGlobalAddingMode,
    AutoWebsiteAddingMode,
    AdditionalData,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum ListingProduct {
    #[sea_orm(iden = "m2epro_listing_product")]
    Table,
    Id,
    ListingId,
    ProductId,
    Component,
    Status,
    StatusChanger,
    ItemId,
    OnlineSku,
    OnlineTitle,
    OnlinePrice,
    OnlineQty,
    OnlineCategory,
    OnlineDetails,
    IsVariationProduct,
    TemplateSellingFormatId,
    TemplateShippingId,
    TemplateDescriptionId,
    TemplateSynchronizationId,
    LastBlockingErrorDate,
    AdditionalData,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum Variation {
    #[sea_orm(iden = "m2epro_listing_product_variation")]
    Table,
    Id,
    ListingProductId,
    OnlineSku,
    OnlinePrice,
    OnlineQty,
    Status,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum VariationOption {
    #[sea_orm(iden = "m2epro_listing_product_variation_option")]
    Table,
    Id,
    ListingProductVariationId,
    ProductId,
    Attribute,
    #[sea_orm(iden = "option")]
    OptionValue,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum Tag {
    #[sea_orm(iden = "m2epro_tag")]
    Table,
    Id,
    Nick,
    ErrorCode,
    Text,
    CreateDate,
}

#[derive(DeriveIden)]
enum TagRelation {
    #[sea_orm(iden = "m2epro_listing_product_tag_relation")]
    Table,
    Id,
    ListingProductId,
    TagId,
    CreateDate,
}
