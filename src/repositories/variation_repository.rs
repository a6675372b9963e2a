use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::entities::listing_product::{self, ListingProductStatus};
use crate::entities::listing_product_variation::{self, Entity as Variation};
use crate::entities::listing_product_variation_option::{self, Entity as VariationOption};
use crate::errors::{is_unique_violation, AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationOptionInput {
    pub attribute: String,
    pub option: String,
    pub product_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVariation {
    pub options: Vec<VariationOptionInput>,
    pub online_sku: Option<String>,
    pub online_price: Option<Decimal>,
    pub online_qty: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariationWithOptions {
    pub variation: listing_product_variation::Model,
    pub options: Vec<listing_product_variation_option::Model>,
}

fn check_distinct_attributes(options: &[VariationOptionInput]) -> Result<(), ServiceError> {
    if options.is_empty() {
        return Err(ServiceError::ValidationError(
            "a variation needs at least one option".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(options.len());
    for option in options {
        let attribute = option.attribute.trim();
        if attribute.is_empty() {
            return Err(ServiceError::ValidationError(
                "variation attribute must not be empty".to_string(),
            ));
        }
        if !seen.insert(attribute) {
            return Err(ServiceError::InvariantViolation(format!(
                "attribute '{}' appears twice in one variation",
                attribute
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct VariationRepository {
    base: BaseRepository,
}

impl VariationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Adds one variation with its options and marks the parent as a variation product.
    #[instrument(skip(self, new))]
    pub async fn add_variation(
        &self,
        listing_product_id: i32,
        new: NewVariation,
    ) -> Result<VariationWithOptions, AppError> {
        check_distinct_attributes(&new.options)?;

        let txn = self.base.get_db().begin().await?;
        let parent = listing_product::Entity::find_by_id(listing_product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("ListingProduct", listing_product_id))?;

        let now = Utc::now();
        let variation = listing_product_variation::ActiveModel {
            listing_product_id: Set(parent.id),
            online_sku: Set(new.online_sku),
            online_price: Set(new.online_price),
            online_qty: Set(new.online_qty),
            status: Set(ListingProductStatus::NotListed),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut options = Vec::with_capacity(new.options.len());
        for input in new.options {
            let option = listing_product_variation_option::ActiveModel {
                listing_product_variation_id: Set(variation.id),
                product_id: Set(input.product_id),
                attribute: Set(input.attribute.trim().to_string()),
                option: Set(input.option),
                update_date: Set(now),
                create_date: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::InvariantViolation(
                        "variation attributes must be distinct".to_string(),
                    )
                } else {
                    ServiceError::db_error(e)
                }
            })?;
            options.push(option);
        }

        if !parent.is_variation_product {
            listing_product::Entity::update_many()
                .col_expr(listing_product::Column::IsVariationProduct, true.into())
                .col_expr(listing_product::Column::UpdateDate, now.into())
                .filter(listing_product::Column::Id.eq(parent.id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        info!(variation_id = variation.id, options = options.len(), "Variation added");
        Ok(VariationWithOptions { variation, options })
    }

    pub async fn list_for_product(
        &self,
        listing_product_id: i32,
    ) -> Result<Vec<VariationWithOptions>, AppError> {
        let rows = Variation::find()
            .filter(listing_product_variation::Column::ListingProductId.eq(listing_product_id))
            .order_by_asc(listing_product_variation::Column::Id)
            .find_with_related(VariationOption)
            .all(self.base.get_db())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(variation, options)| VariationWithOptions { variation, options })
            .collect())
    }

    pub async fn remove_variation(&self, variation_id: i32) -> Result<bool, AppError> {
        let txn = self.base.get_db().begin().await?;
        VariationOption::delete_many()
            .filter(
                listing_product_variation_option::Column::ListingProductVariationId
                    .eq(variation_id),
            )
            .exec(&txn)
            .await?;
        let result = Variation::delete_by_id(variation_id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

impl Repository for VariationRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(attribute: &str, value: &str) -> VariationOptionInput {
        VariationOptionInput {
            attribute: attribute.to_string(),
            option: value.to_string(),
            product_id: None,
        }
    }

    #[test]
    fn distinct_attributes_pass() {
        assert!(check_distinct_attributes(&[option("Color", "Red"), option("Size", "M")]).is_ok());
    }

    #[test]
    fn repeated_attribute_is_rejected() {
        let result = check_distinct_attributes(&[option("Color", "Red"), option(" Color ", "Blue")]);
        assert!(matches!(result, Err(ServiceError::InvariantViolation(_))));
    }

    #[test]
    fn empty_option_list_is_rejected() {
        assert!(matches!(
            check_distinct_attributes(&[]),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
