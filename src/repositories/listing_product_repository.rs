use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::entities::listing_product::{
    self, Column, Entity as ListingProduct, ListingProductStatus, Model as ListingProductModel,
    StatusChanger,
};
use crate::entities::{
    listing, listing_product_instruction, listing_product_scheduled_action,
    listing_product_tag_relation, listing_product_variation, listing_product_variation_option,
};
use crate::errors::{AppError, ServiceError};
use crate::repositories::listing_repository::{validate_template_slots, ListingTemplates};
use crate::repositories::Repository;

use super::BaseRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddProductOutcome {
    Added(ListingProductModel),
    /// The product was already in the listing; the existing row is returned.
    AlreadyPresent(ListingProductModel),
}

impl AddProductOutcome {
    pub fn listing_product(&self) -> &ListingProductModel {
        match self {
            Self::Added(lp) | Self::AlreadyPresent(lp) => lp,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// Marketplace-mirrored fields, overwritten as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnlineState {
    pub item_id: Option<String>,
    pub sku: Option<String>,
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub qty: Option<i32>,
    pub category: Option<String>,
    pub details: Option<Json>,
}

/// Deletes listing products and every row hanging off them.
pub(crate) async fn delete_listing_products<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> Result<u64, DbErr> {
    if ids.is_empty() {
        return Ok(0);
    }

    let variation_ids: Vec<i32> = listing_product_variation::Entity::find()
        .select_only()
        .column(listing_product_variation::Column::Id)
        .filter(listing_product_variation::Column::ListingProductId.is_in(ids.to_vec()))
        .into_tuple()
        .all(db)
        .await?;

    if !variation_ids.is_empty() {
        listing_product_variation_option::Entity::delete_many()
            .filter(
                listing_product_variation_option::Column::ListingProductVariationId
                    .is_in(variation_ids),
            )
            .exec(db)
            .await?;
    }

    listing_product_variation::Entity::delete_many()
        .filter(listing_product_variation::Column::ListingProductId.is_in(ids.to_vec()))
        .exec(db)
        .await?;
    listing_product_instruction::Entity::delete_many()
        .filter(listing_product_instruction::Column::ListingProductId.is_in(ids.to_vec()))
        .exec(db)
        .await?;
    listing_product_scheduled_action::Entity::delete_many()
        .filter(listing_product_scheduled_action::Column::ListingProductId.is_in(ids.to_vec()))
        .exec(db)
        .await?;
    listing_product_tag_relation::Entity::delete_many()
        .filter(listing_product_tag_relation::Column::ListingProductId.is_in(ids.to_vec()))
        .exec(db)
        .await?;

    let result = ListingProduct::delete_many()
        .filter(Column::Id.is_in(ids.to_vec()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[derive(Debug, Clone)]
pub struct ListingProductRepository {
    base: BaseRepository,
}

impl ListingProductRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Adds a catalog product to a listing at most once.
    #[instrument(skip(self))]
    pub async fn add_product(
        &self,
        listing_id: i32,
        product_id: i32,
    ) -> Result<AddProductOutcome, AppError> {
        let db = self.base.get_db();
        let listing = listing::Entity::find_by_id(listing_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Listing", listing_id))?;

        let now = Utc::now();
        let model = listing_product::ActiveModel {
            listing_id: Set(listing.id),
            product_id: Set(product_id),
            component: Set(listing.component),
            status: Set(ListingProductStatus::NotListed),
            status_changer: Set(StatusChanger::Unknown),
            is_variation_product: Set(false),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        let inserted = match ListingProduct::insert(model)
            .on_conflict(
                OnConflict::columns([Column::ListingId, Column::ProductId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await
        {
            Ok(rows) => rows > 0,
            Err(DbErr::RecordNotInserted) => false,
            Err(e) => return Err(ServiceError::db_error(e)),
        };

        let row = self
            .find_by_listing_and_product(listing_id, product_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "listing product ({}, {}) vanished after insert",
                    listing_id, product_id
                ))
            })?;

        if inserted {
            info!(listing_product_id = row.id, listing_id, product_id, "Product added to listing");
            Ok(AddProductOutcome::Added(row))
        } else {
            debug!(listing_product_id = row.id, "Product already in listing");
            Ok(AddProductOutcome::AlreadyPresent(row))
        }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<ListingProductModel>, AppError> {
        ListingProduct::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn require(&self, id: i32) -> Result<ListingProductModel, AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("ListingProduct", id))
    }

    pub async fn find_by_listing_and_product(
        &self,
        listing_id: i32,
        product_id: i32,
    ) -> Result<Option<ListingProductModel>, AppError> {
        ListingProduct::find()
            .filter(Column::ListingId.eq(listing_id))
            .filter(Column::ProductId.eq(product_id))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn list_by_listing(
        &self,
        listing_id: i32,
    ) -> Result<Vec<ListingProductModel>, AppError> {
        ListingProduct::find()
            .filter(Column::ListingId.eq(listing_id))
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn list_by_status(
        &self,
        status: ListingProductStatus,
        limit: u64,
    ) -> Result<Vec<ListingProductModel>, AppError> {
        ListingProduct::find()
            .filter(Column::Status.eq(status))
            .order_by_asc(Column::Id)
            .limit(limit)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Moving into `blocked` stamps `last_blocking_error_date`; leaving it clears the stamp.
    pub async fn set_status(
        &self,
        id: i32,
        status: ListingProductStatus,
        changer: StatusChanger,
    ) -> Result<ListingProductModel, AppError> {
        let current = self.require(id).await?;
        let previous = current.status;
        let now = Utc::now();

        let mut lp = current.into_active_model();
        lp.status = Set(status);
        lp.status_changer = Set(changer);
        if status == ListingProductStatus::Blocked {
            lp.last_blocking_error_date = Set(Some(now));
        } else if previous == ListingProductStatus::Blocked {
            lp.last_blocking_error_date = Set(None);
        }
        lp.update_date = Set(now);

        let updated = lp.update(self.base.get_db()).await?;
        debug!(listing_product_id = id, from = %previous, to = %status, changer = %changer, "Status changed");
        Ok(updated)
    }

    pub async fn update_online_state(
        &self,
        id: i32,
        state: OnlineState,
    ) -> Result<ListingProductModel, AppError> {
        let mut lp = self.require(id).await?.into_active_model();
        lp.item_id = Set(state.item_id);
        lp.online_sku = Set(state.sku);
        lp.online_title = Set(state.title);
        lp.online_price = Set(state.price);
        lp.online_qty = Set(state.qty);
        lp.online_category = Set(state.category);
        lp.online_details = Set(state.details);
        lp.update_date = Set(Utc::now());
        Ok(lp.update(self.base.get_db()).await?)
    }

    /// Per-product template overrides, validated like listing defaults.
    pub async fn set_template_overrides(
        &self,
        id: i32,
        templates: ListingTemplates,
    ) -> Result<ListingProductModel, AppError> {
        let db = self.base.get_db();
        let current = self.require(id).await?;
        validate_template_slots(db, current.component, &templates).await?;

        let mut lp = current.into_active_model();
        lp.template_selling_format_id = Set(templates.selling_format);
        lp.template_shipping_id = Set(templates.shipping);
        lp.template_description_id = Set(templates.description);
        lp.template_synchronization_id = Set(templates.synchronization);
        lp.update_date = Set(Utc::now());
        Ok(lp.update(db).await?)
    }

    /// Removes a product from its listing with variations, queue rows and tags.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> Result<bool, AppError> {
        let txn = self.base.get_db().begin().await?;
        let removed = delete_listing_products(&txn, &[id]).await?;
        txn.commit().await?;
        if removed > 0 {
            info!(listing_product_id = id, "Listing product removed");
        }
        Ok(removed > 0)
    }
}

impl Repository for ListingProductRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
