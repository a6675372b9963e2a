use chrono::Utc;
use metrics::counter;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entities::common::Component;
use crate::entities::listing_product;
use crate::entities::listing_product_scheduled_action::{
    self, Column, Entity as ScheduledAction, Model as ScheduledActionModel, ScheduledActionType,
};
use crate::errors::{conflict_or_db, AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScheduledAction {
    pub listing_product_id: i32,
    pub component: Component,
    pub action_type: ScheduledActionType,
    #[serde(default)]
    pub is_force: bool,
    pub tag: Option<String>,
    pub additional_data: Option<Json>,
}

impl NewScheduledAction {
    fn into_active_model(self) -> listing_product_scheduled_action::ActiveModel {
        let now = Utc::now();
        listing_product_scheduled_action::ActiveModel {
            listing_product_id: Set(self.listing_product_id),
            component: Set(self.component),
            action_type: Set(self.action_type),
            is_force: Set(self.is_force),
            tag: Set(self.tag),
            additional_data: Set(self.additional_data),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        }
    }
}

/// At most one pending action per listing product.
#[derive(Debug, Clone)]
pub struct ScheduledActionRepository {
    base: BaseRepository,
}

impl ScheduledActionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn ensure_listing_product(&self, listing_product_id: i32) -> Result<(), AppError> {
        listing_product::Entity::find_by_id(listing_product_id)
            .one(self.base.get_db())
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("ListingProduct", listing_product_id))
    }

    /// Schedules `action`, replacing whatever was scheduled for the product.
    ///
    /// The replace is a single `ON CONFLICT DO UPDATE`, so concurrent writers
    /// leave exactly one row behind.
    #[instrument(skip(self, action), fields(listing_product_id = action.listing_product_id))]
    pub async fn upsert(&self, action: NewScheduledAction) -> Result<ScheduledActionModel, AppError> {
        let listing_product_id = action.listing_product_id;
        self.ensure_listing_product(listing_product_id).await?;
        let db = self.base.get_db();

        ScheduledAction::insert(action.into_active_model())
            .on_conflict(
                OnConflict::column(Column::ListingProductId)
                    .update_columns([
                        Column::Component,
                        Column::ActionType,
                        Column::IsForce,
                        Column::Tag,
                        Column::AdditionalData,
                        Column::UpdateDate,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        counter!("m2e_store.scheduled_action.upserted", 1);
        let row = self
            .find_for_product(listing_product_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "scheduled action for listing product {} vanished after upsert",
                    listing_product_id
                ))
            })?;
        debug!(action_type = %row.action_type, "Scheduled action stored");
        Ok(row)
    }

    /// Plain insert. A product that already has an action is a conflict.
    pub async fn insert(&self, action: NewScheduledAction) -> Result<ScheduledActionModel, AppError> {
        let listing_product_id = action.listing_product_id;
        self.ensure_listing_product(listing_product_id).await?;

        let result = ScheduledAction::insert(action.into_active_model())
            .exec(self.base.get_db())
            .await
            .map_err(|e| {
                conflict_or_db(e, || {
                    format!(
                        "listing product {} already has a scheduled action",
                        listing_product_id
                    )
                })
            })?;

        ScheduledAction::find_by_id(result.last_insert_id)
            .one(self.base.get_db())
            .await?
            .ok_or_else(|| ServiceError::not_found("ScheduledAction", result.last_insert_id))
    }

    pub async fn find_for_product(
        &self,
        listing_product_id: i32,
    ) -> Result<Option<ScheduledActionModel>, AppError> {
        ScheduledAction::find()
            .filter(Column::ListingProductId.eq(listing_product_id))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Forced actions first, then oldest.
    pub async fn list_by_action(
        &self,
        action_type: ScheduledActionType,
        limit: u64,
    ) -> Result<Vec<ScheduledActionModel>, AppError> {
        ScheduledAction::find()
            .filter(Column::ActionType.eq(action_type))
            .order_by_desc(Column::IsForce)
            .order_by_asc(Column::CreateDate)
            .order_by_asc(Column::Id)
            .limit(limit)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn remove_for_product(&self, listing_product_id: i32) -> Result<bool, AppError> {
        let result = ScheduledAction::delete_many()
            .filter(Column::ListingProductId.eq(listing_product_id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }
}

impl Repository for ScheduledActionRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
