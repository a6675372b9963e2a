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
                    .table(Instruction::Table)
                    .col(&mut id_column(Instruction::Id))
                    .col(ColumnDef::new(Instruction::ListingProductId).integer().not_null())
                    .col(ColumnDef::new(Instruction::Component).string_len(16).not_null())
                    .col(ColumnDef::new(Instruction::Type).string_len(255).not_null())
                    .col(ColumnDef::new(Instruction::Initiator).string_len(255).not_null())
                    .col(ColumnDef::new(Instruction::Priority).integer().not_null())
                    .col(
                        ColumnDef::new(Instruction::SkipUntil)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Instruction::AdditionalData).json().null())
                    .col(&mut date_column(Instruction::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_instruction_listing_product_id",
                Instruction::Table,
                [Instruction::ListingProductId],
                false,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_instruction_priority_create_date",
                Instruction::Table,
                [Instruction::Priority, Instruction::CreateDate],
                false,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_instruction_skip_until",
                Instruction::Table,
                [Instruction::SkipUntil],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScheduledAction::Table)
                    .col(&mut id_column(ScheduledAction::Id))
                    .col(
                        ColumnDef::new(ScheduledAction::ListingProductId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScheduledAction::Component).string_len(16).not_null())
                    .col(ColumnDef::new(ScheduledAction::ActionType).string_len(16).not_null())
                    .col(&mut flag_column(ScheduledAction::IsForce))
                    .col(ColumnDef::new(ScheduledAction::Tag).string_len(255).null())
                    .col(ColumnDef::new(ScheduledAction::AdditionalData).json().null())
                    .col(&mut date_column(ScheduledAction::UpdateDate))
                    .col(&mut date_column(ScheduledAction::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_scheduled_action_listing_product_id",
                ScheduledAction::Table,
                [ScheduledAction::ListingProductId],
                true,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_scheduled_action_action_type",
                ScheduledAction::Table,
                [ScheduledAction::ActionType],
                false,
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScheduledAction::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Instruction::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Instruction {
    #[sea_orm(iden = "m2epro_listing_product_instruction")]
    Table,
    Id,
    ListingProductId,
    Component,
    Type,
    Initiator,
    Priority,
    SkipUntil,
    AdditionalData,
    CreateDate,
}

#[derive(DeriveIden)]
enum ScheduledAction {
    #[sea_orm(iden = "m2epro_listing_product_scheduled_action")]
    Table,
    Id,
    ListingProductId,
    Component,
    ActionType,
    IsForce,
    Tag,
    AdditionalData,
    UpdateDate,
    CreateDate,
}
