use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::sea_query::{Condition, Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use serde_json::Value as Json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::entities::order;
use crate::entities::order_change::{
    self, Column, Entity as OrderChange, Model as OrderChangeModel, OrderChangeAction,
};
use crate::errors::{AppError, ServiceError};
use crate::repositories::processing_repository::to_chrono;
use crate::repositories::Repository;

use super::BaseRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "change", rename_all = "snake_case")]
pub enum EnqueueOutcome {
    Queued(OrderChangeModel),
    /// An identical change is already queued
    Duplicate(OrderChangeModel),
}

impl EnqueueOutcome {
    pub fn change(&self) -> &OrderChangeModel {
        match self {
            Self::Queued(change) | Self::Duplicate(change) => change,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }
}

/// JSON with object keys sorted at every level.
fn canonical(value: &Json) -> Json {
    match value {
        Json::Object(map) => {
            let sorted: BTreeMap<&String, Json> =
                map.iter().map(|(k, v)| (k, canonical(v))).collect();
            Json::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v))
                    .collect(),
            )
        }
        Json::Array(items) => Json::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// Identity of a change: the same order, action and params always hash alike.
pub fn change_hash(order_id: i32, action: OrderChangeAction, params: &Json) -> String {
    let mut hasher = Sha256::new();
    hasher.update(order_id.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(action.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(canonical(params).to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Outbound changes to marketplace orders, de-duplicated by hash.
#[derive(Debug, Clone)]
pub struct OrderChangeRepository {
    base: BaseRepository,
}

impl OrderChangeRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    #[instrument(skip(self, params))]
    pub async fn enqueue(
        &self,
        order_id: i32,
        action: OrderChangeAction,
        params: Json,
    ) -> Result<EnqueueOutcome, AppError> {
        let db = self.base.get_db();
        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;

        let hash = change_hash(order_id, action, &params);
        let now = Utc::now();
        let model = order_change::ActiveModel {
            order_id: Set(order_id),
            component: Set(order.component),
            action: Set(action),
            params: Set(params),
            processing_attempt_count: Set(0),
            processing_attempt_date: Set(None),
            hash: Set(hash.clone()),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        let inserted = OrderChange::insert(model)
            .on_conflict(OnConflict::column(Column::Hash).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;
        let queued = match inserted {
            Ok(rows) => rows > 0,
            Err(DbErr::RecordNotInserted) => false,
            Err(e) => return Err(ServiceError::db_error(e)),
        };

        let change = OrderChange::find()
            .filter(Column::Hash.eq(hash.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("OrderChange", &hash))?;

        if queued {
            counter!("m2e_store.order_change.queued", 1);
            Ok(EnqueueOutcome::Queued(change))
        } else {
            debug!(change_id = change.id, "Identical order change already queued");
            counter!("m2e_store.order_change.duplicate", 1);
            Ok(EnqueueOutcome::Duplicate(change))
        }
    }

    /// Changes due for processing: under `max_attempts` and idle for at least `backoff`.
    pub async fn ready(
        &self,
        max_attempts: i32,
        now: DateTime<Utc>,
        backoff: Duration,
        limit: u64,
    ) -> Result<Vec<OrderChangeModel>, AppError> {
        let cutoff = now - to_chrono(backoff)?;
        OrderChange::find()
            .filter(Column::ProcessingAttemptCount.lt(max_attempts))
            .filter(
                Condition::any()
                    .add(Column::ProcessingAttemptDate.is_null())
                    .add(Column::ProcessingAttemptDate.lte(cutoff)),
            )
            .order_by_asc(Column::CreateDate)
            .order_by_asc(Column::Id)
            .limit(limit)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn record_attempt(&self, id: i32, now: DateTime<Utc>) -> Result<bool, AppError> {
        let result = OrderChange::update_many()
            .col_expr(
                Column::ProcessingAttemptCount,
                Expr::col(Column::ProcessingAttemptCount).add(1),
            )
            .col_expr(Column::ProcessingAttemptDate, Some(now).into())
            .col_expr(Column::UpdateDate, now.into())
            .filter(Column::Id.eq(id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn for_order(&self, order_id: i32) -> Result<Vec<OrderChangeModel>, AppError> {
        OrderChange::find()
            .filter(Column::OrderId.eq(order_id))
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn remove(&self, id: i32) -> Result<bool, AppError> {
        let result = OrderChange::delete_by_id(id)
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }
}

impl Repository for OrderChangeRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_ignores_key_order() {
        let a = json!({"carrier": "ups", "tracking": {"number": "1Z", "url": null}});
        let b = json!({"tracking": {"url": null, "number": "1Z"}, "carrier": "ups"});
        assert_eq!(
            change_hash(7, OrderChangeAction::UpdateShipping, &a),
            change_hash(7, OrderChangeAction::UpdateShipping, &b)
        );
    }

    #[test]
    fn hash_depends_on_order_and_action() {
        let params = json!({"reason": "buyer"});
        let base = change_hash(7, OrderChangeAction::Cancel, &params);
        assert_ne!(base, change_hash(8, OrderChangeAction::Cancel, &params));
        assert_ne!(base, change_hash(7, OrderChangeAction::Refund, &params));
        assert_eq!(base.len(), 64);
    }
}
