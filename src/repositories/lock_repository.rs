use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use metrics::counter;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    EntityName, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::db::{for_update_clause, statement};
use crate::entities::lock_item::{self, Entity as LockItem, Model as LockItemModel};
use crate::entities::lock_transactional::{self, Entity as LockTransactional};
use crate::entities::processing::{self, Entity as Processing};
use crate::entities::processing_lock::{self, Entity as ProcessingLock, Model as ProcessingLockModel};
use crate::errors::{AppError, ServiceError};
use crate::repositories::processing_repository::to_chrono;
use crate::repositories::Repository;

use super::BaseRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LockAcquisition {
    Acquired(ProcessingLockModel),
    /// Another live processing owns the object
    Held { processing_id: i32 },
}

impl LockAcquisition {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired(_))
    }
}

/// A lock is stale once its processing is gone, completed or expired.
fn is_stale(owner: Option<&processing::Model>, now: DateTime<Utc>) -> bool {
    match owner {
        None => true,
        Some(p) => p.is_completed || p.is_expired(now),
    }
}

/// Locks held by processings over `(model_name, object_id)` pairs.
#[derive(Debug, Clone)]
pub struct ProcessingLockRepository {
    base: BaseRepository,
}

impl ProcessingLockRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Claims `(model_name, object_id)` for `processing_id`.
    ///
    /// Stale locks on the key are cleared first. The insert itself relies on
    /// the unique index, so of two racing callers exactly one gets `Acquired`.
    #[instrument(skip(self, tag))]
    pub async fn acquire(
        &self,
        processing_id: i32,
        model_name: &str,
        object_id: i32,
        tag: Option<String>,
    ) -> Result<LockAcquisition, AppError> {
        let now = Utc::now();
        let txn = self.base.get_db().begin().await?;

        let Some(owner) = Processing::find_by_id(processing_id).one(&txn).await? else {
            txn.rollback().await?;
            return Err(ServiceError::not_found("Processing", processing_id));
        };
        if is_stale(Some(&owner), now) {
            txn.rollback().await?;
            return Err(ServiceError::InvalidStatus(format!(
                "processing {} is no longer pending and cannot take locks",
                processing_id
            )));
        }

        let existing = ProcessingLock::find()
            .filter(processing_lock::Column::ModelName.eq(model_name))
            .filter(processing_lock::Column::ObjectId.eq(object_id))
            .find_also_related(Processing)
            .all(&txn)
            .await?;

        for (lock, holder) in existing {
            if lock.processing_id == processing_id {
                txn.commit().await?;
                return Ok(LockAcquisition::Acquired(lock));
            }
            if is_stale(holder.as_ref(), now) {
                debug!(lock_id = lock.id, stale_processing_id = lock.processing_id, "Clearing stale lock");
                ProcessingLock::delete_by_id(lock.id).exec(&txn).await?;
            }
        }

        let model = processing_lock::ActiveModel {
            processing_id: Set(processing_id),
            model_name: Set(model_name.to_string()),
            object_id: Set(object_id),
            tag: Set(tag),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        let inserted = ProcessingLock::insert(model)
            .on_conflict(
                OnConflict::columns([
                    processing_lock::Column::ModelName,
                    processing_lock::Column::ObjectId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await;

        let inserted = match inserted {
            Ok(rows) => rows > 0,
            Err(DbErr::RecordNotInserted) => false,
            Err(e) => return Err(ServiceError::db_error(e)),
        };

        let current = ProcessingLock::find()
            .filter(processing_lock::Column::ModelName.eq(model_name))
            .filter(processing_lock::Column::ObjectId.eq(object_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "lock on {}#{} vanished during acquisition",
                    model_name, object_id
                ))
            })?;
        txn.commit().await?;

        if inserted && current.processing_id == processing_id {
            counter!("m2e_store.lock.acquired", 1);
            Ok(LockAcquisition::Acquired(current))
        } else {
            counter!("m2e_store.lock.conflict", 1);
            debug!(holder = current.processing_id, "Lock held by another processing");
            Ok(LockAcquisition::Held {
                processing_id: current.processing_id,
            })
        }
    }

    /// Releases every lock held by the processing.
    pub async fn release(&self, processing_id: i32) -> Result<u64, AppError> {
        let result = ProcessingLock::delete_many()
            .filter(processing_lock::Column::ProcessingId.eq(processing_id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn release_one(
        &self,
        processing_id: i32,
        model_name: &str,
        object_id: i32,
    ) -> Result<bool, AppError> {
        let result = ProcessingLock::delete_many()
            .filter(processing_lock::Column::ProcessingId.eq(processing_id))
            .filter(processing_lock::Column::ModelName.eq(model_name))
            .filter(processing_lock::Column::ObjectId.eq(object_id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// True when a live processing holds the object.
    pub async fn is_locked(
        &self,
        model_name: &str,
        object_id: i32,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let locks = ProcessingLock::find()
            .filter(processing_lock::Column::ModelName.eq(model_name))
            .filter(processing_lock::Column::ObjectId.eq(object_id))
            .find_also_related(Processing)
            .all(self.base.get_db())
            .await?;
        Ok(locks.iter().any(|(_, owner)| !is_stale(owner.as_ref(), now)))
    }

    pub async fn locks_for(&self, processing_id: i32) -> Result<Vec<ProcessingLockModel>, AppError> {
        ProcessingLock::find()
            .filter(processing_lock::Column::ProcessingId.eq(processing_id))
            .order_by_asc(processing_lock::Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Deletes locks whose processing is gone, completed or expired.
    #[instrument(skip(self))]
    pub async fn release_stale(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let db = self.base.get_db();
        let stale: Vec<i32> = ProcessingLock::find()
            .find_also_related(Processing)
            .all(db)
            .await?
            .into_iter()
            .filter(|(_, owner)| is_stale(owner.as_ref(), now))
            .map(|(lock, _)| lock.id)
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }
        let result = ProcessingLock::delete_many()
            .filter(processing_lock::Column::Id.is_in(stale))
            .exec(db)
            .await?;
        info!(released = result.rows_affected, "Stale processing locks released");
        Ok(result.rows_affected)
    }
}

impl Repository for ProcessingLockRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

/// Named locks kept alive by heartbeats.
///
/// A lock whose last heartbeat is older than the caller's `max_inactive`
/// may be taken over by a new owner.
#[derive(Debug, Clone)]
pub struct LockItemRepository {
    base: BaseRepository,
}

impl LockItemRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find(&self, nick: &str) -> Result<Option<LockItemModel>, AppError> {
        LockItem::find()
            .filter(lock_item::Column::Nick.eq(nick))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Returns whether the caller now owns `nick`.
    #[instrument(skip(self))]
    pub async fn acquire(
        &self,
        nick: &str,
        parent_id: Option<i32>,
        max_inactive: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let db = self.base.get_db();
        let model = lock_item::ActiveModel {
            nick: Set(nick.to_string()),
            parent_id: Set(parent_id),
            data: Set(None),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        let inserted = LockItem::insert(model)
            .on_conflict(
                OnConflict::column(lock_item::Column::Nick)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match inserted {
            Ok(rows) if rows > 0 => {
                counter!("m2e_store.lock_item.acquired", 1);
                return Ok(true);
            }
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(ServiceError::db_error(e)),
        }

        let cutoff = now - to_chrono(max_inactive)?;
        let taken = LockItem::update_many()
            .col_expr(lock_item::Column::ParentId, parent_id.into())
            .col_expr(lock_item::Column::Data, Option::<Json>::None.into())
            .col_expr(lock_item::Column::UpdateDate, now.into())
            .col_expr(lock_item::Column::CreateDate, now.into())
            .filter(lock_item::Column::Nick.eq(nick))
            .filter(lock_item::Column::UpdateDate.lt(cutoff))
            .exec(db)
            .await?;

        if taken.rows_affected == 1 {
            warn!(nick, "Took over inactive lock");
            counter!("m2e_store.lock_item.taken_over", 1);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub async fn heartbeat(&self, nick: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let result = LockItem::update_many()
            .col_expr(lock_item::Column::UpdateDate, now.into())
            .filter(lock_item::Column::Nick.eq(nick))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn set_data(&self, nick: &str, data: Option<Json>) -> Result<bool, AppError> {
        let result = LockItem::update_many()
            .col_expr(lock_item::Column::Data, data.into())
            .col_expr(lock_item::Column::UpdateDate, Utc::now().into())
            .filter(lock_item::Column::Nick.eq(nick))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Removes the lock together with locks that name it as parent.
    pub async fn release(&self, nick: &str) -> Result<bool, AppError> {
        let txn = self.base.get_db().begin().await?;
        let Some(lock) = LockItem::find()
            .filter(lock_item::Column::Nick.eq(nick))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(false);
        };

        LockItem::delete_many()
            .filter(lock_item::Column::ParentId.eq(lock.id))
            .exec(&txn)
            .await?;
        LockItem::delete_by_id(lock.id).exec(&txn).await?;
        txn.commit().await?;
        Ok(true)
    }

    pub async fn is_locked(
        &self,
        nick: &str,
        max_inactive: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let cutoff = now - to_chrono(max_inactive)?;
        Ok(self
            .find(nick)
            .await?
            .map(|lock| lock.update_date >= cutoff)
            .unwrap_or(false))
    }
}

impl Repository for LockItemRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

/// Serialises critical sections across processes by row-locking a named row.
#[derive(Debug, Clone)]
pub struct LockTransactionalRepository {
    base: BaseRepository,
}

impl LockTransactionalRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn ensure_row(&self, nick: &str) -> Result<(), AppError> {
        let model = lock_transactional::ActiveModel {
            nick: Set(nick.to_string()),
            create_date: Set(Utc::now()),
            ..Default::default()
        };
        let result = LockTransactional::insert(model)
            .on_conflict(
                OnConflict::column(lock_transactional::Column::Nick)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.base.get_db())
            .await;
        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(ServiceError::db_error(e)),
        }
    }

    /// Runs `f` inside a transaction that holds the lock row for `nick`.
    ///
    /// Commits when `f` succeeds and rolls back otherwise.
    #[instrument(skip(self, f))]
    pub async fn with_lock<F, T>(&self, nick: &str, f: F) -> Result<T, AppError>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, AppError>> + Send,
        T: Send,
    {
        self.ensure_row(nick).await?;

        let txn = self.base.get_db().begin().await?;
        let backend = txn.get_database_backend();
        let table = LockTransactional.table_name();
        // SQLite has no row locks; a write takes the database lock instead.
        let sql = match backend {
            DbBackend::Sqlite => format!("UPDATE {} SET nick = nick WHERE nick = ?", table),
            _ => format!(
                "SELECT id FROM {} WHERE nick = ?{}",
                table,
                for_update_clause(backend)
            ),
        };
        txn.execute(statement(backend, &sql, vec![nick.into()]))
            .await?;
        debug!(nick, "Transactional lock taken");

        match f(&txn).await {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }
}

impl Repository for LockTransactionalRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
