use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::entities::common::Component;
use crate::entities::template::{self, Column, Entity as Template, Model as TemplateModel, TemplateNick};
use crate::entities::{listing, listing_product};
use crate::errors::{AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTemplate {
    pub nick: TemplateNick,
    pub component: Component,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub is_custom_template: bool,
    pub data: Json,
}

pub(crate) fn listing_slot(nick: TemplateNick) -> listing::Column {
    match nick {
        TemplateNick::SellingFormat => listing::Column::TemplateSellingFormatId,
        TemplateNick::Shipping => listing::Column::TemplateShippingId,
        TemplateNick::Description => listing::Column::TemplateDescriptionId,
        TemplateNick::Synchronization => listing::Column::TemplateSynchronizationId,
    }
}

pub(crate) fn listing_product_slot(nick: TemplateNick) -> listing_product::Column {
    match nick {
        TemplateNick::SellingFormat => listing_product::Column::TemplateSellingFormatId,
        TemplateNick::Shipping => listing_product::Column::TemplateShippingId,
        TemplateNick::Description => listing_product::Column::TemplateDescriptionId,
        TemplateNick::Synchronization => listing_product::Column::TemplateSynchronizationId,
    }
}

#[derive(Debug, Clone)]
pub struct TemplateRepository {
    base: BaseRepository,
}

impl TemplateRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, new: NewTemplate) -> Result<TemplateModel, AppError> {
        new.validate()?;
        let now = Utc::now();
        let template = template::ActiveModel {
            nick: Set(new.nick),
            component: Set(new.component),
            title: Set(new.title),
            is_custom_template: Set(new.is_custom_template),
            data: Set(new.data),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        }
        .insert(self.base.get_db())
        .await?;

        info!(template_id = template.id, nick = %template.nick, "Template created");
        Ok(template)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<TemplateModel>, AppError> {
        Template::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Templates offered in pickers; custom templates are excluded.
    pub async fn list(
        &self,
        nick: TemplateNick,
        component: Component,
    ) -> Result<Vec<TemplateModel>, AppError> {
        Template::find()
            .filter(Column::Nick.eq(nick))
            .filter(Column::Component.eq(component))
            .filter(Column::IsCustomTemplate.eq(false))
            .order_by_asc(Column::Title)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn update_data(&self, id: i32, data: Json) -> Result<TemplateModel, AppError> {
        let mut template = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Template", id))?
            .into_active_model();
        template.data = Set(data);
        template.update_date = Set(Utc::now());
        Ok(template.update(self.base.get_db()).await?)
    }

    /// Deletes a template nothing refers to.
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        let db = self.base.get_db();
        let template = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Template", id))?;

        let listings = listing::Entity::find()
            .filter(listing_slot(template.nick).eq(id))
            .count(db)
            .await?;
        let products = listing_product::Entity::find()
            .filter(listing_product_slot(template.nick).eq(id))
            .count(db)
            .await?;

        if listings + products > 0 {
            return Err(ServiceError::InvariantViolation(format!(
                "template {} is used by {} listing(s) and {} listing product(s)",
                id, listings, products
            )));
        }

        Template::delete_by_id(id).exec(db).await?;
        info!(template_id = id, "Template deleted");
        Ok(())
    }
}

impl Repository for TemplateRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
