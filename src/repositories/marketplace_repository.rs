use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::entities::common::Component;
use crate::entities::marketplace::{Column, Entity as Marketplace, Model as MarketplaceModel};
use crate::errors::{AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

/// Capability flags corrected by upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceCapabilities {
    pub is_vat: bool,
    pub is_tax_table: bool,
    pub is_variations: bool,
    pub is_metric_measurement: bool,
}

/// Read-mostly access to seeded marketplaces.
#[derive(Debug, Clone)]
pub struct MarketplaceRepository {
    base: BaseRepository,
}

impl MarketplaceRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<MarketplaceModel>, AppError> {
        Marketplace::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn find_by_native_id(
        &self,
        component: Component,
        native_id: &str,
    ) -> Result<Option<MarketplaceModel>, AppError> {
        Marketplace::find()
            .filter(Column::Component.eq(component))
            .filter(Column::NativeId.eq(native_id))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn list(
        &self,
        component: Component,
        only_enabled: bool,
    ) -> Result<Vec<MarketplaceModel>, AppError> {
        let mut query = Marketplace::find().filter(Column::Component.eq(component));
        if only_enabled {
            query = query.filter(Column::IsEnabled.eq(true));
        }
        query
            .order_by_asc(Column::Sorder)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn set_enabled(&self, id: i32, enabled: bool) -> Result<MarketplaceModel, AppError> {
        let mut marketplace = self.require(id).await?.into_active_model();
        marketplace.is_enabled = Set(enabled);
        marketplace.update_date = Set(Utc::now());
        let updated = marketplace.update(self.base.get_db()).await?;
        info!(marketplace_id = id, enabled, "Marketplace availability changed");
        Ok(updated)
    }

    pub async fn update_capabilities(
        &self,
        id: i32,
        capabilities: MarketplaceCapabilities,
    ) -> Result<MarketplaceModel, AppError> {
        let mut marketplace = self.require(id).await?.into_active_model();
        marketplace.is_vat = Set(capabilities.is_vat);
        marketplace.is_tax_table = Set(capabilities.is_tax_table);
        marketplace.is_variations = Set(capabilities.is_variations);
        marketplace.is_metric_measurement = Set(capabilities.is_metric_measurement);
        marketplace.update_date = Set(Utc::now());
        Ok(marketplace.update(self.base.get_db()).await?)
    }

    async fn require(&self, id: i32) -> Result<MarketplaceModel, AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Marketplace", id))
    }
}

impl Repository for MarketplaceRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
