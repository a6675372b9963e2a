use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::sea_query::Condition;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::entities::common::Component;
use crate::entities::listing_product;
use crate::entities::listing_product_instruction::{
    self, Column, Entity as Instruction, Model as InstructionModel,
};
use crate::errors::{AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInstruction {
    pub listing_product_id: i32,
    pub component: Component,
    pub instruction_type: String,
    pub initiator: String,
    pub priority: i32,
    pub skip_until: Option<DateTime<Utc>>,
    pub additional_data: Option<Json>,
}

/// Queue of pending work per listing product.
///
/// Consumers claim rows by deleting them; a row is handed to whichever
/// consumer's delete affected it.
#[derive(Debug, Clone)]
pub struct InstructionRepository {
    base: BaseRepository,
}

impl InstructionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    #[instrument(skip(self, instructions), fields(count = instructions.len()))]
    pub async fn enqueue(&self, instructions: Vec<NewInstruction>) -> Result<u64, AppError> {
        if instructions.is_empty() {
            return Ok(0);
        }
        let db = self.base.get_db();

        let ids: BTreeSet<i32> = instructions.iter().map(|i| i.listing_product_id).collect();
        let existing = listing_product::Entity::find()
            .filter(listing_product::Column::Id.is_in(ids.iter().copied()))
            .count(db)
            .await?;
        if existing != ids.len() as u64 {
            return Err(ServiceError::NotFound(format!(
                "instructions reference {} listing product(s) that do not exist",
                ids.len() as u64 - existing
            )));
        }

        let now = Utc::now();
        let count = instructions.len() as u64;
        let models = instructions
            .into_iter()
            .map(|i| listing_product_instruction::ActiveModel {
                listing_product_id: Set(i.listing_product_id),
                component: Set(i.component),
                instruction_type: Set(i.instruction_type),
                initiator: Set(i.initiator),
                priority: Set(i.priority),
                skip_until: Set(i.skip_until),
                additional_data: Set(i.additional_data),
                create_date: Set(now),
                ..Default::default()
            });

        Instruction::insert_many(models)
            .exec_without_returning(db)
            .await?;
        debug!(count, "Instructions enqueued");
        Ok(count)
    }

    /// Instructions due at `now`: lowest priority value first, then oldest.
    pub async fn pending(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<InstructionModel>, AppError> {
        Instruction::find()
            .filter(
                Condition::any()
                    .add(Column::SkipUntil.is_null())
                    .add(Column::SkipUntil.lte(now)),
            )
            .order_by_asc(Column::Priority)
            .order_by_asc(Column::CreateDate)
            .order_by_asc(Column::Id)
            .limit(limit)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Takes up to `limit` due instructions off the queue.
    ///
    /// Rows already taken by a concurrent consumer are skipped, so each
    /// instruction is returned to exactly one caller.
    #[instrument(skip(self))]
    pub async fn claim_batch(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<InstructionModel>, AppError> {
        let db = self.base.get_db();
        let candidates = self.pending(now, limit).await?;
        let mut claimed = Vec::with_capacity(candidates.len());

        for instruction in candidates {
            let result = Instruction::delete_many()
                .filter(Column::Id.eq(instruction.id))
                .exec(db)
                .await?;
            if result.rows_affected == 1 {
                claimed.push(instruction);
            }
        }

        counter!("m2e_store.instruction.claimed", claimed.len() as u64);
        if !claimed.is_empty() {
            info!(claimed = claimed.len(), "Instructions claimed");
        }
        Ok(claimed)
    }

    /// Hides an instruction from consumers until `until`.
    pub async fn defer(&self, id: i32, until: DateTime<Utc>) -> Result<bool, AppError> {
        let result = Instruction::update_many()
            .col_expr(Column::SkipUntil, Some(until).into())
            .filter(Column::Id.eq(id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn remove_for_product(&self, listing_product_id: i32) -> Result<u64, AppError> {
        let result = Instruction::delete_many()
            .filter(Column::ListingProductId.eq(listing_product_id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn count_for_product(&self, listing_product_id: i32) -> Result<u64, AppError> {
        Instruction::find()
            .filter(Column::ListingProductId.eq(listing_product_id))
            .count(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn list_for_product(
        &self,
        listing_product_id: i32,
    ) -> Result<Vec<InstructionModel>, AppError> {
        Instruction::find()
            .filter(Column::ListingProductId.eq(listing_product_id))
            .order_by_asc(Column::Priority)
            .order_by_asc(Column::CreateDate)
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }
}

impl Repository for InstructionRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
