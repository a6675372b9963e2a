use sea_orm_migration::prelude::*;

use super::{date_column, id_column};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Setup::Table)
                    .if_not_exists()
                    .col(&mut id_column(Setup::Id))
                    .col(ColumnDef::new(Setup::VersionFrom).string_len(32).null())
                    .col(ColumnDef::new(Setup::VersionTo).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Setup::IsBackuped)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Setup::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Setup::ProfilerData).text().null())
                    .col(&mut date_column(Setup::UpdateDate))
                    .col(&mut date_column(Setup::CreateDate))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Setup::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Setup {
    #[sea_orm(iden = "m2epro_setup")]
    Table,
    Id,
    VersionFrom,
    VersionTo,
    IsBackuped,
    IsCompleted,
    ProfilerData,
    UpdateDate,
    CreateDate,
}
