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
                    .table(Processing::Table)
                    .col(&mut id_column(Processing::Id))
                    .col(ColumnDef::new(Processing::Model).string_len(255).not_null())
                    .col(ColumnDef::new(Processing::Params).json().not_null())
                    .col(ColumnDef::new(Processing::ResultData).json().null())
                    .col(ColumnDef::new(Processing::ResultMessages).json().null())
                    .col(&mut flag_column(Processing::IsCompleted))
                    .col(&mut date_column(Processing::ExpirationDate))
                    .col(&mut date_column(Processing::UpdateDate))
                    .col(&mut date_column(Processing::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_processing_expiration_date",
                Processing::Table,
                [Processing::ExpirationDate],
                false,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_processing_is_completed",
                Processing::Table,
                [Processing::IsCompleted],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProcessingLock::Table)
                    .col(&mut id_column(ProcessingLock::Id))
                    .col(ColumnDef::new(ProcessingLock::ProcessingId).integer().not_null())
                    .col(ColumnDef::new(ProcessingLock::ModelName).string_len(255).not_null())
                    .col(ColumnDef::new(ProcessingLock::ObjectId).integer().not_null())
                    .col(ColumnDef::new(ProcessingLock::Tag).string_len(255).null())
                    .col(&mut date_column(ProcessingLock::UpdateDate))
                    .col(&mut date_column(ProcessingLock::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_processing_lock_model_object",
                ProcessingLock::Table,
                [ProcessingLock::ModelName, ProcessingLock::ObjectId],
                true,
            ))
            .await?;
        manager
            .create_index(index_on(
                "idx_m2epro_processing_lock_processing_id",
                ProcessingLock::Table,
                [ProcessingLock::ProcessingId],
                false,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LockItem::Table)
                    .col(&mut id_column(LockItem::Id))
                    .col(ColumnDef::new(LockItem::Nick).string_len(255).not_null())
                    .col(ColumnDef::new(LockItem::ParentId).integer().null())
                    .col(ColumnDef::new(LockItem::Data).json().null())
                    .col(&mut date_column(LockItem::UpdateDate))
                    .col(&mut date_column(LockItem::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_lock_item_nick",
                LockItem::Table,
                [LockItem::Nick],
                true,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LockTransactional::Table)
                    .col(&mut id_column(LockTransactional::Id))
                    .col(ColumnDef::new(LockTransactional::Nick).string_len(255).not_null())
                    .col(&mut date_column(LockTransactional::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_lock_transactional_nick",
                LockTransactional::Table,
                [LockTransactional::Nick],
                true,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RequestPendingSingle::Table)
                    .col(&mut id_column(RequestPendingSingle::Id))
                    .col(ColumnDef::new(RequestPendingSingle::Component).string_len(16).not_null())
                    .col(
                        ColumnDef::new(RequestPendingSingle::ServerHash)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RequestPendingSingle::ResultData).json().null())
                    .col(ColumnDef::new(RequestPendingSingle::ResultMessages).json().null())
                    .col(&mut date_column(RequestPendingSingle::ExpirationDate))
                    .col(&mut flag_column(RequestPendingSingle::IsCompleted))
                    .col(&mut date_column(RequestPendingSingle::UpdateDate))
                    .col(&mut date_column(RequestPendingSingle::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_request_pending_single_hash",
                RequestPendingSingle::Table,
                [
                    RequestPendingSingle::Component,
                    RequestPendingSingle::ServerHash,
                ],
                true,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RequestPendingPartial::Table)
                    .col(&mut id_column(RequestPendingPartial::Id))
                    .col(
                        ColumnDef::new(RequestPendingPartial::Component)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestPendingPartial::ServerHash)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestPendingPartial::NextPart)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(RequestPendingPartial::ResultMessages).json().null())
                    .col(&mut date_column(RequestPendingPartial::ExpirationDate))
                    .col(&mut flag_column(RequestPendingPartial::IsCompleted))
                    .col(&mut date_column(RequestPendingPartial::UpdateDate))
                    .col(&mut date_column(RequestPendingPartial::CreateDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_request_pending_partial_hash",
                RequestPendingPartial::Table,
                [
                    RequestPendingPartial::Component,
                    RequestPendingPartial::ServerHash,
                ],
                true,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RequestPendingPartialData::Table)
                    .col(&mut id_column(RequestPendingPartialData::Id))
                    .col(
                        ColumnDef::new(RequestPendingPartialData::RequestPendingPartialId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestPendingPartialData::PartNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RequestPendingPartialData::Data).json().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(index_on(
                "idx_m2epro_request_pending_partial_data_part",
                RequestPendingPartialData::Table,
                [
                    RequestPendingPartialData::RequestPendingPartialId,
                    RequestPendingPartialData::PartNumber,
                ],
                true,
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(RequestPendingPartialData::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(RequestPendingPartial::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RequestPendingSingle::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LockTransactional::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LockItem::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProcessingLock::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Processing::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Processing {
    #[sea_orm(iden = "m2epro_processing")]
    Table,
    Id,
    Model,
    Params,
    ResultData,
    ResultMessages,
    IsCompleted,
    ExpirationDate,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum ProcessingLock {
    #[sea_orm(iden = "m2epro_processing_lock")]
    Table,
    Id,
    ProcessingId,
    ModelName,
    ObjectId,
    Tag,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum LockItem {
    #[sea_orm(iden = "m2epro_lock_item")]
    Table,
    Id,
    Nick,
    ParentId,
    Data,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum LockTransactional {
    #[sea_orm(iden = "m2epro_lock_transactional")]
    Table,
    Id,
    Nick,
    CreateDate,
}

#[derive(DeriveIden)]
enum RequestPendingSingle {
    #[sea_orm(iden = "m2epro_request_pending_single")]
    Table,
    Id,
    Component,
    ServerHash,
    ResultData,
    ResultMessages,
    ExpirationDate,
    IsCompleted,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum RequestPendingPartial {
    #[sea_orm(iden = "m2epro_request_pending_partial")]
    Table,
    Id,
    Component,
    ServerHash,
    NextPart,
    ResultMessages,
    ExpirationDate,
    IsCompleted,
    UpdateDate,
    CreateDate,
}

#[derive(DeriveIden)]
enum RequestPendingPartialData {
    #[sea_orm(iden = "m2epro_request_pending_partial_data")]
    Table,
    Id,
    RequestPendingPartialId,
    PartNumber,
    Data,
}
