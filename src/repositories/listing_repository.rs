use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::entities::common::Component;
use crate::entities::listing::{self, AutoMode, Column, Entity as Listing, Model as ListingModel};
use crate::entities::template::{self, TemplateNick};
use crate::entities::{account, listing_product};
use crate::errors::{AppError, ServiceError};
use crate::repositories::listing_product_repository::delete_listing_products;
use crate::repositories::Repository;

use super::BaseRepository;

/// Default template per slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingTemplates {
    pub selling_format: Option<i32>,
    pub shipping: Option<i32>,
    pub description: Option<i32>,
    pub synchronization: Option<i32>,
}

impl ListingTemplates {
    pub(crate) fn slots(&self) -> [(TemplateNick, Option<i32>); 4] {
        [
            (TemplateNick::SellingFormat, self.selling_format),
            (TemplateNick::Shipping, self.shipping),
            (TemplateNick::Description, self.description),
            (TemplateNick::Synchronization, self.synchronization),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewListing {
    pub account_id: i32,
    pub marketplace_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub store_id: i32,
    #[serde(default)]
    pub templates: ListingTemplates,
    #[serde(default = "default_auto_mode")]
    pub auto_mode: AutoMode,
}

fn default_auto_mode() -> AutoMode {
    AutoMode::None
}

/// Checks that every filled slot points at a template of that slot's nick
/// and of the given component.
pub(crate) async fn validate_template_slots<C: ConnectionTrait>(
    db: &C,
    component: Component,
    templates: &ListingTemplates,
) -> Result<(), ServiceError> {
    for (nick, id) in templates.slots() {
        let Some(id) = id else { continue };
        let template = template::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Template", id))?;

        if template.nick != nick || template.component != component {
            return Err(ServiceError::InvariantViolation(format!(
                "template {} is a {} {} template and cannot fill the {} {} slot",
                id, template.component, template.nick, component, nick
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ListingRepository {
    base: BaseRepository,
}

impl ListingRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Creates a listing. Its marketplace must be the account's marketplace.
    #[instrument(skip(self, new), fields(account_id = new.account_id))]
    pub async fn create(&self, new: NewListing) -> Result<ListingModel, AppError> {
        new.validate()?;
        let db = self.base.get_db();

        let account = account::Entity::find_by_id(new.account_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Account", new.account_id))?;

        if account.marketplace_id != new.marketplace_id {
            return Err(ServiceError::InvariantViolation(format!(
                "listing marketplace {} differs from account {} marketplace {}",
                new.marketplace_id, account.id, account.marketplace_id
            )));
        }

        validate_template_slots(db, account.component, &new.templates).await?;

        let listing = listing::ActiveModel {
            account_id: Set(account.id),
            marketplace_id: Set(account.marketplace_id),
            component: Set(account.component),
            title: Set(new.title),
            store_id: Set(new.store_id),
            template_selling_format_id: Set(new.templates.selling_format),
            template_shipping_id: Set(new.templates.shipping),
            template_description_id: Set(new.templates.description),
            template_synchronization_id: Set(new.templates.synchronization),
            auto_mode: Set(new.auto_mode),
            auto_global_adding_mode: Set(false),
            auto_website_adding_mode: Set(false),
            additional_data: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(listing_id = listing.id, "Listing created");
        Ok(listing)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<ListingModel>, AppError> {
        Listing::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn require(&self, id: i32) -> Result<ListingModel, AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Listing", id))
    }

    pub async fn list_by_account(&self, account_id: i32) -> Result<Vec<ListingModel>, AppError> {
        Listing::find()
            .filter(Column::AccountId.eq(account_id))
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn set_templates(
        &self,
        id: i32,
        templates: ListingTemplates,
    ) -> Result<ListingModel, AppError> {
        let db = self.base.get_db();
        let listing = self.require(id).await?;
        validate_template_slots(db, listing.component, &templates).await?;

        let mut listing = listing.into_active_model();
        listing.template_selling_format_id = Set(templates.selling_format);
        listing.template_shipping_id = Set(templates.shipping);
        listing.template_description_id = Set(templates.description);
        listing.template_synchronization_id = Set(templates.synchronization);
        Ok(listing.update(db).await?)
    }

    pub async fn update_auto_mode(
        &self,
        id: i32,
        auto_mode: AutoMode,
        global_adding: bool,
        website_adding: bool,
    ) -> Result<ListingModel, AppError> {
        let mut listing = self.require(id).await?.into_active_model();
        listing.auto_mode = Set(auto_mode);
        listing.auto_global_adding_mode = Set(global_adding);
        listing.auto_website_adding_mode = Set(website_adding);
        Ok(listing.update(self.base.get_db()).await?)
    }

    /// Deletes a listing together with its products and their children.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<u64, AppError> {
        let txn = self.base.get_db().begin().await?;

        let product_ids: Vec<i32> = listing_product::Entity::find()
            .select_only()
            .column(listing_product::Column::Id)
            .filter(listing_product::Column::ListingId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        let removed = delete_listing_products(&txn, &product_ids).await?;
        let result = Listing::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(ServiceError::not_found("Listing", id));
        }

        txn.commit().await?;
        info!(listing_id = id, listing_products = removed, "Listing deleted");
        Ok(removed)
    }
}

impl Repository for ListingRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
