use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::entities::common::Component;
use crate::entities::request_pending_partial::{
    self, Entity as RequestPartial, Model as RequestPartialModel,
};
use crate::entities::request_pending_partial_data::{self, Entity as RequestPartialData};
use crate::entities::request_pending_single::{
    self, Entity as RequestSingle, Model as RequestSingleModel,
};
use crate::errors::{conflict_or_db, AppError, ServiceError};
use crate::repositories::processing_repository::to_chrono;
use crate::repositories::Repository;

use super::BaseRepository;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifecycle of a continuation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestState {
    Pending,
    Completed,
    /// Expired before completion; the remote result is no longer awaited
    Abandoned,
}

impl RequestState {
    fn derive(is_completed: bool, expiration_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if is_completed {
            Self::Completed
        } else if expiration_date <= now {
            Self::Abandoned
        } else {
            Self::Pending
        }
    }
}

fn expiration(
    explicit: Option<DateTime<Utc>>,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ServiceError> {
    match explicit {
        Some(date) => Ok(date),
        None => Ok(now + to_chrono(ttl)?),
    }
}

#[derive(Debug, Clone)]
pub struct RequestPendingSingleRepository {
    base: BaseRepository,
    default_ttl: Duration,
}

impl RequestPendingSingleRepository {
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

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        component: Component,
        server_hash: &str,
        expiration_date: Option<DateTime<Utc>>,
    ) -> Result<RequestSingleModel, AppError> {
        let now = Utc::now();
        let model = request_pending_single::ActiveModel {
            component: Set(component),
            server_hash: Set(server_hash.to_string()),
            result_data: Set(None),
            result_messages: Set(None),
            expiration_date: Set(expiration(expiration_date, self.default_ttl, now)?),
            is_completed: Set(false),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        }
        .insert(self.base.get_db())
        .await
        .map_err(|e| {
            conflict_or_db(e, || {
                format!("{} request {} is already pending", component, server_hash)
            })
        })?;

        debug!(request_id = model.id, "Single request registered");
        Ok(model)
    }

    pub async fn find_by_hash(
        &self,
        component: Component,
        server_hash: &str,
    ) -> Result<Option<RequestSingleModel>, AppError> {
        RequestSingle::find()
            .filter(request_pending_single::Column::Component.eq(component))
            .filter(request_pending_single::Column::ServerHash.eq(server_hash))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    async fn require(&self, id: i32) -> Result<RequestSingleModel, AppError> {
        RequestSingle::find_by_id(id)
            .one(self.base.get_db())
            .await?
            .ok_or_else(|| ServiceError::not_found("RequestPendingSingle", id))
    }

    /// Stores the remote result. Completing twice, or after expiry, is rejected.
    #[instrument(skip(self, result_data, result_messages))]
    pub async fn complete(
        &self,
        id: i32,
        result_data: Option<Json>,
        result_messages: Option<Json>,
        now: DateTime<Utc>,
    ) -> Result<RequestSingleModel, AppError> {
        let result = RequestSingle::update_many()
            .col_expr(request_pending_single::Column::IsCompleted, true.into())
            .col_expr(request_pending_single::Column::ResultData, result_data.into())
            .col_expr(request_pending_single::Column::ResultMessages, result_messages.into())
            .col_expr(request_pending_single::Column::UpdateDate, now.into())
            .filter(request_pending_single::Column::Id.eq(id))
            .filter(request_pending_single::Column::IsCompleted.eq(false))
            .filter(request_pending_single::Column::ExpirationDate.gt(now))
            .exec(self.base.get_db())
            .await?;

        let current = self.require(id).await?;
        if result.rows_affected == 1 {
            return Ok(current);
        }
        Err(rejected_completion(
            "request",
            id,
            RequestState::derive(current.is_completed, current.expiration_date, now),
        ))
    }

    pub async fn state(&self, id: i32, now: DateTime<Utc>) -> Result<RequestState, AppError> {
        let row = self.require(id).await?;
        Ok(RequestState::derive(row.is_completed, row.expiration_date, now))
    }

    /// Requests still worth polling or reading: completed, or pending and not expired.
    pub async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<RequestSingleModel>, AppError> {
        RequestSingle::find()
            .filter(
                request_pending_single::Column::IsCompleted
                    .eq(true)
                    .or(request_pending_single::Column::ExpirationDate.gt(now)),
            )
            .order_by_asc(request_pending_single::Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn remove(&self, id: i32) -> Result<bool, AppError> {
        let result = RequestSingle::delete_by_id(id)
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Deletes abandoned requests.
    pub async fn remove_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = RequestSingle::delete_many()
            .filter(request_pending_single::Column::IsCompleted.eq(false))
            .filter(request_pending_single::Column::ExpirationDate.lte(now))
            .exec(self.base.get_db())
            .await?;
        if result.rows_affected > 0 {
            counter!("m2e_store.request_pending.expired", result.rows_affected);
            info!(removed = result.rows_affected, "Expired single requests removed");
        }
        Ok(result.rows_affected)
    }
}

impl Repository for RequestPendingSingleRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

/// Continuations whose result arrives in numbered pages.
///
/// Pages must arrive in order starting at 1; `next_part` names the page
/// expected next and only moves forward.
#[derive(Debug, Clone)]
pub struct RequestPendingPartialRepository {
    base: BaseRepository,
    default_ttl: Duration,
}

impl RequestPendingPartialRepository {
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

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        component: Component,
        server_hash: &str,
        expiration_date: Option<DateTime<Utc>>,
    ) -> Result<RequestPartialModel, AppError> {
        let now = Utc::now();
        request_pending_partial::ActiveModel {
            component: Set(component),
            server_hash: Set(server_hash.to_string()),
            next_part: Set(1),
            result_messages: Set(None),
            expiration_date: Set(expiration(expiration_date, self.default_ttl, now)?),
            is_completed: Set(false),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        }
        .insert(self.base.get_db())
        .await
        .map_err(|e| {
            conflict_or_db(e, || {
                format!("{} request {} is already pending", component, server_hash)
            })
        })
    }

    pub async fn find_by_hash(
        &self,
        component: Component,
        server_hash: &str,
    ) -> Result<Option<RequestPartialModel>, AppError> {
        RequestPartial::find()
            .filter(request_pending_partial::Column::Component.eq(component))
            .filter(request_pending_partial::Column::ServerHash.eq(server_hash))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    async fn require(&self, id: i32) -> Result<RequestPartialModel, AppError> {
        RequestPartial::find_by_id(id)
            .one(self.base.get_db())
            .await?
            .ok_or_else(|| ServiceError::not_found("RequestPendingPartial", id))
    }

    /// Stores page `part_number`.
    ///
    /// The page is accepted only when it is the one expected next and the
    /// request is still live; the advance of `next_part` and the page insert
    /// commit together.
    #[instrument(skip(self, data))]
    pub async fn store_part(&self, id: i32, part_number: i32, data: Json) -> Result<(), AppError> {
        if part_number < 1 {
            return Err(ServiceError::ValidationError(format!(
                "part number must start at 1, got {}",
                part_number
            )));
        }

        let txn = self.base.get_db().begin().await?;
        let now = Utc::now();
        let advanced = RequestPartial::update_many()
            .col_expr(
                request_pending_partial::Column::NextPart,
                Expr::col(request_pending_partial::Column::NextPart).add(1),
            )
            .col_expr(request_pending_partial::Column::UpdateDate, now.into())
            .filter(request_pending_partial::Column::Id.eq(id))
            .filter(request_pending_partial::Column::NextPart.eq(part_number))
            .filter(request_pending_partial::Column::IsCompleted.eq(false))
            .filter(request_pending_partial::Column::ExpirationDate.gt(now))
            .exec(&txn)
            .await?;

        if advanced.rows_affected != 1 {
            txn.rollback().await?;
            let current = self.require(id).await?;
            let state = RequestState::derive(current.is_completed, current.expiration_date, now);
            warn!(
                request_id = id,
                part_number,
                next_part = current.next_part,
                state = ?state,
                "Rejected page"
            );
            return Err(match state {
                RequestState::Abandoned => rejected_completion("partial request", id, state),
                RequestState::Completed => {
                    ServiceError::Conflict(format!("request {} is already completed", id))
                }
                RequestState::Pending => ServiceError::Conflict(format!(
                    "request {} expects part {}, got {}",
                    id, current.next_part, part_number
                )),
            });
        }

        request_pending_partial_data::ActiveModel {
            request_pending_partial_id: Set(id),
            part_number: Set(part_number),
            data: Set(data),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| conflict_or_db(e, || format!("part {} of request {} already stored", part_number, id)))?;

        txn.commit().await?;
        counter!("m2e_store.request_pending.part_stored", 1);
        Ok(())
    }

    pub async fn complete(
        &self,
        id: i32,
        result_messages: Option<Json>,
        now: DateTime<Utc>,
    ) -> Result<RequestPartialModel, AppError> {
        let result = RequestPartial::update_many()
            .col_expr(request_pending_partial::Column::IsCompleted, true.into())
            .col_expr(request_pending_partial::Column::ResultMessages, result_messages.into())
            .col_expr(request_pending_partial::Column::UpdateDate, now.into())
            .filter(request_pending_partial::Column::Id.eq(id))
            .filter(request_pending_partial::Column::IsCompleted.eq(false))
            .filter(request_pending_partial::Column::ExpirationDate.gt(now))
            .exec(self.base.get_db())
            .await?;

        let current = self.require(id).await?;
        if result.rows_affected == 1 {
            return Ok(current);
        }
        Err(rejected_completion(
            "partial request",
            id,
            RequestState::derive(current.is_completed, current.expiration_date, now),
        ))
    }

    pub async fn state(&self, id: i32, now: DateTime<Utc>) -> Result<RequestState, AppError> {
        let row = self.require(id).await?;
        Ok(RequestState::derive(row.is_completed, row.expiration_date, now))
    }

    /// Page payloads of a completed request, in order. Fails if any page in
    /// `1..next_part` is missing.
    pub async fn assemble(&self, id: i32) -> Result<Vec<Json>, AppError> {
        let request = self.require(id).await?;
        if !request.is_completed {
            return Err(ServiceError::InvalidStatus(format!(
                "partial request {} is not completed",
                id
            )));
        }
        let parts = RequestPartialData::find()
            .filter(request_pending_partial_data::Column::RequestPendingPartialId.eq(id))
            .order_by_asc(request_pending_partial_data::Column::PartNumber)
            .all(self.base.get_db())
            .await?;

        let expected = (request.next_part - 1).max(0) as usize;
        if parts.len() != expected {
            return Err(ServiceError::InvariantViolation(format!(
                "request {} has {} stored part(s) but expects {}",
                id,
                parts.len(),
                expected
            )));
        }
        for (index, part) in parts.iter().enumerate() {
            if part.part_number != index as i32 + 1 {
                return Err(ServiceError::InvariantViolation(format!(
                    "request {} is missing part {}",
                    id,
                    index + 1
                )));
            }
        }
        Ok(parts.into_iter().map(|p| p.data).collect())
    }

    pub async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<RequestPartialModel>, AppError> {
        RequestPartial::find()
            .filter(
                request_pending_partial::Column::IsCompleted
                    .eq(true)
                    .or(request_pending_partial::Column::ExpirationDate.gt(now)),
            )
            .order_by_asc(request_pending_partial::Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn remove(&self, id: i32) -> Result<bool, AppError> {
        let txn = self.base.get_db().begin().await?;
        RequestPartialData::delete_many()
            .filter(request_pending_partial_data::Column::RequestPendingPartialId.eq(id))
            .exec(&txn)
            .await?;
        let result = RequestPartial::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// Deletes abandoned requests together with their stored pages.
    pub async fn remove_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let txn = self.base.get_db().begin().await?;
        let expired: Vec<i32> = RequestPartial::find()
            .filter(request_pending_partial::Column::IsCompleted.eq(false))
            .filter(request_pending_partial::Column::ExpirationDate.lte(now))
            .all(&txn)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        if expired.is_empty() {
            txn.commit().await?;
            return Ok(0);
        }

        RequestPartialData::delete_many()
            .filter(request_pending_partial_data::Column::RequestPendingPartialId.is_in(expired.clone()))
            .exec(&txn)
            .await?;
        let result = RequestPartial::delete_many()
            .filter(request_pending_partial::Column::Id.is_in(expired))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        counter!("m2e_store.request_pending.expired", result.rows_affected);
        info!(removed = result.rows_affected, "Expired partial requests removed");
        Ok(result.rows_affected)
    }
}

impl Repository for RequestPendingPartialRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

fn rejected_completion(what: &str, id: i32, state: RequestState) -> ServiceError {
    match state {
        RequestState::Abandoned => {
            ServiceError::Expired(format!("{} {} expired before completion", what, id))
        }
        _ => ServiceError::InvalidStatus(format!("{} {} is already completed", what, id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn state_derivation() {
        let now = Utc::now();
        let later = now + ChronoDuration::hours(1);
        let earlier = now - ChronoDuration::hours(1);
        assert_eq!(RequestState::derive(false, later, now), RequestState::Pending);
        assert_eq!(RequestState::derive(false, earlier, now), RequestState::Abandoned);
        assert_eq!(RequestState::derive(true, earlier, now), RequestState::Completed);
    }

    #[test]
    fn completion_rejection_maps_state_to_error() {
        assert!(matches!(
            rejected_completion("request", 1, RequestState::Abandoned),
            ServiceError::Expired(_)
        ));
        assert!(matches!(
            rejected_completion("request", 1, RequestState::Completed),
            ServiceError::InvalidStatus(_)
        ));
    }
}
