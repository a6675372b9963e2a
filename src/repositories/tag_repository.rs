use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use std::sync::Arc;
use tracing::debug;

use crate::entities::listing_product_tag_relation::{self, Entity as TagRelation};
use crate::entities::tag::{self, Column, Entity as Tag, Model as TagModel, HAS_ERROR_NICK};
use crate::errors::{AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

/// Diagnostic tags and their attachment to listing products.
#[derive(Debug, Clone)]
pub struct TagRepository {
    base: BaseRepository,
}

impl TagRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_nick(&self, nick: &str) -> Result<Option<TagModel>, AppError> {
        Tag::find()
            .filter(Column::Nick.eq(nick))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Returns the tag for `error_code`, creating it on first use. The nick is the error code.
    pub async fn get_or_create(&self, error_code: &str, text: &str) -> Result<TagModel, AppError> {
        let model = tag::ActiveModel {
            nick: Set(error_code.to_string()),
            error_code: Set(error_code.to_string()),
            text: Set(text.to_string()),
            create_date: Set(Utc::now()),
            ..Default::default()
        };

        match Tag::insert(model)
            .on_conflict(OnConflict::column(Column::Nick).do_nothing().to_owned())
            .exec_without_returning(self.base.get_db())
            .await
        {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(ServiceError::db_error(e)),
        }

        self.find_by_nick(error_code)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tag", error_code))
    }

    /// Links a tag to a listing product. Linking twice is a no-op.
    pub async fn attach(&self, listing_product_id: i32, tag_id: i32) -> Result<bool, AppError> {
        let model = listing_product_tag_relation::ActiveModel {
            listing_product_id: Set(listing_product_id),
            tag_id: Set(tag_id),
            create_date: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = match TagRelation::insert(model)
            .on_conflict(
                OnConflict::columns([
                    listing_product_tag_relation::Column::ListingProductId,
                    listing_product_tag_relation::Column::TagId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.base.get_db())
            .await
        {
            Ok(rows) => rows > 0,
            Err(DbErr::RecordNotInserted) => false,
            Err(e) => return Err(ServiceError::db_error(e)),
        };

        debug!(listing_product_id, tag_id, inserted, "Tag attached");
        Ok(inserted)
    }

    /// Tags a product with an error code and with the `has_error` marker.
    pub async fn attach_error(
        &self,
        listing_product_id: i32,
        error_code: &str,
        text: &str,
    ) -> Result<TagModel, AppError> {
        let tag = self.get_or_create(error_code, text).await?;
        self.attach(listing_product_id, tag.id).await?;

        if tag.nick != HAS_ERROR_NICK {
            let has_error = self.get_or_create(HAS_ERROR_NICK, "Has error").await?;
            self.attach(listing_product_id, has_error.id).await?;
        }
        Ok(tag)
    }

    pub async fn detach(&self, listing_product_id: i32, tag_id: i32) -> Result<bool, AppError> {
        let result = TagRelation::delete_many()
            .filter(listing_product_tag_relation::Column::ListingProductId.eq(listing_product_id))
            .filter(listing_product_tag_relation::Column::TagId.eq(tag_id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn detach_all(&self, listing_product_id: i32) -> Result<u64, AppError> {
        let result = TagRelation::delete_many()
            .filter(listing_product_tag_relation::Column::ListingProductId.eq(listing_product_id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn tags_for(&self, listing_product_id: i32) -> Result<Vec<TagModel>, AppError> {
        Tag::find()
            .inner_join(TagRelation)
            .filter(listing_product_tag_relation::Column::ListingProductId.eq(listing_product_id))
            .order_by_asc(Column::Nick)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn listing_products_with_tag(&self, tag_id: i32) -> Result<Vec<i32>, AppError> {
        TagRelation::find()
            .select_only()
            .column(listing_product_tag_relation::Column::ListingProductId)
            .filter(listing_product_tag_relation::Column::TagId.eq(tag_id))
            .order_by_asc(listing_product_tag_relation::Column::ListingProductId)
            .into_tuple()
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }
}

impl Repository for TagRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
