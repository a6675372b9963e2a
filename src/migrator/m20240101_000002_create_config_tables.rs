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
                    .table(Config::Table)
                    .if_not_exists()
                    .col(&mut id_column(Config::Id))
                    .col(ColumnDef::new(Config::Group).string_len(255).not_null())
                    .col(ColumnDef::new(Config::Key).string_len(255).not_null())
                    .col(ColumnDef::new(Config::Value).text().null())
                    .col(&mut date_column(Config::UpdateDate))
                    .col(&mut date_column(Config::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_config_group_key",
                Config::Table,
                [Config::Group, Config::Key],
                true,
            )
            .if_not_exists()
            .to_owned())
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Wizard::Table)
                    .if_not_exists()
                    .col(&mut id_column(Wizard::Id))
                    .col(ColumnDef::new(Wizard::Nick).string_len(255).not_null())
                    .col(ColumnDef::new(Wizard::View).string_len(255).not_null())
                    .col(ColumnDef::new(Wizard::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Wizard::Step).string_len(255).null())
                    .col(
                        ColumnDef::new(Wizard::Type)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wizard::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_wizard_nick",
                Wizard::Table,
                [Wizard::Nick],
                true,
            )
            .if_not_exists()
            .to_owned())
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Wizard::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Config::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Config {
    #[sea_orm(iden = "m2epro_config")]
    Table,
    Id,
    Group,
    Key,
    Value,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum Wizard {
    #[sea_orm(iden = "m2epro_wizard")]
    Table,
    Id,
    Nick,
    View,
    Status,
    Step,
    Type,
    Priority,
}
