use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::entities::processing::{self, Column, Entity as Processing, Model as ProcessingModel};
use crate::entities::processing_lock;
use crate::errors::{AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProcessing {
    pub model: String,
    pub params: Json,
    /// Falls back to the repository's default lifetime
    pub expiration_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    Completed,
    Expired,
}

impl ProcessingState {
    pub fn of(model: &ProcessingModel, now: DateTime<Utc>) -> Self {
        if model.is_completed {
            Self::Completed
        } else if model.is_expired(now) {
            Self::Expired
        } else {
            Self::Pending
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingRepository {
    base: BaseRepository,
    default_ttl: Duration,
}

impl ProcessingRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    #[instrument(skip(self, new), fields(model = %new.model))]
    pub async fn create(&self, new: NewProcessing) -> Result<ProcessingModel, AppError> {
        let now = Utc::now();
        let expiration_date = match new.expiration_date {
            Some(date) => date,
            None => now + to_chrono(self.default_ttl)?,
        };

        let model = processing::ActiveModel {
            model: Set(new.model),
            params: Set(new.params),
            result_data: Set(None),
            result_messages: Set(None),
            is_completed: Set(false),
            expiration_date: Set(expiration_date),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        }
        .insert(self.base.get_db())
        .await?;

        counter!("m2e_store.processing.created", 1);
        info!(processing_id = model.id, expiration_date = %model.expiration_date, "Processing created");
        Ok(model)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<ProcessingModel>, AppError> {
        Processing::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn require(&self, id: i32) -> Result<ProcessingModel, AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Processing", id))
    }

    pub async fn state(&self, id: i32, now: DateTime<Utc>) -> Result<ProcessingState, AppError> {
        Ok(ProcessingState::of(&self.require(id).await?, now))
    }

    /// Stores the result and marks the processing completed.
    ///
    /// Only a pending processing can complete; the check and the write are
    /// one guarded update.
    #[instrument(skip(self, result_data, result_messages))]
    pub async fn complete(
        &self,
        id: i32,
        result_data: Option<Json>,
        result_messages: Option<Json>,
        now: DateTime<Utc>,
    ) -> Result<ProcessingModel, AppError> {
        let db = self.base.get_db();
        let result = Processing::update_many()
            .col_expr(Column::IsCompleted, true.into())
            .col_expr(Column::ResultData, result_data.into())
            .col_expr(Column::ResultMessages, result_messages.into())
            .col_expr(Column::UpdateDate, now.into())
            .filter(Column::Id.eq(id))
            .filter(Column::IsCompleted.eq(false))
            .filter(Column::ExpirationDate.gt(now))
            .exec(db)
            .await?;

        let current = self.require(id).await?;
        if result.rows_affected == 1 {
            counter!("m2e_store.processing.completed", 1);
            return Ok(current);
        }

        match ProcessingState::of(&current, now) {
            ProcessingState::Expired => {
                warn!(processing_id = id, "Refusing to complete expired processing");
                Err(ServiceError::Expired(format!(
                    "processing {} expired at {}",
                    id, current.expiration_date
                )))
            }
            _ => Err(ServiceError::InvalidStatus(format!(
                "processing {} is already completed",
                id
            ))),
        }
    }

    /// Incomplete processings that have not expired, oldest first.
    pub async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<ProcessingModel>, AppError> {
        Processing::find()
            .filter(Column::IsCompleted.eq(false))
            .filter(Column::ExpirationDate.gt(now))
            .order_by_asc(Column::CreateDate)
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<ProcessingModel>, AppError> {
        Processing::find()
            .filter(Column::IsCompleted.eq(false))
            .filter(Column::ExpirationDate.lte(now))
            .order_by_asc(Column::ExpirationDate)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Deletes the processing and every lock it holds.
    pub async fn remove(&self, id: i32) -> Result<bool, AppError> {
        let txn = self.base.get_db().begin().await?;

        processing_lock::Entity::delete_many()
            .filter(processing_lock::Column::ProcessingId.eq(id))
            .exec(&txn)
            .await?;
        let result = Processing::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

impl Repository for ProcessingRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

pub(crate) fn to_chrono(duration: Duration) -> Result<chrono::Duration, ServiceError> {
    chrono::Duration::from_std(duration)
        .map_err(|e| ServiceError::ConfigError(format!("duration out of range: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    fn model(is_completed: bool, expires_in: i64) -> ProcessingModel {
        let now = Utc::now();
        ProcessingModel {
            id: 1,
            model: "Ebay_Listing_Product_Action_List".to_string(),
            params: json!({}),
            result_data: None,
            result_messages: None,
            is_completed,
            expiration_date: now + ChronoDuration::seconds(expires_in),
            update_date: now,
            create_date: now,
        }
    }

    #[test]
    fn state_is_derived_from_completion_and_expiry() {
        let now = Utc::now();
        assert_eq!(ProcessingState::of(&model(false, 60), now), ProcessingState::Pending);
        assert_eq!(ProcessingState::of(&model(false, -60), now), ProcessingState::Expired);
        assert_eq!(ProcessingState::of(&model(true, -60), now), ProcessingState::Completed);
    }
}
