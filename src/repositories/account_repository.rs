use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::entities::account::{self, Column, Entity as Account, Model as AccountModel};
use crate::entities::common::Component;
use crate::entities::marketplace::Entity as Marketplace;
use crate::errors::{AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAccount {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub component: Component,
    pub marketplace_id: i32,
    pub server_hash: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub credentials: Json,
}

/// Seller accounts. Accounts are deactivated, never deleted.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    base: BaseRepository,
}

impl AccountRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Connects an account to a marketplace of the same component.
    #[instrument(skip(self, new), fields(title = %new.title))]
    pub async fn create(&self, new: NewAccount) -> Result<AccountModel, AppError> {
        new.validate()?;
        let db = self.base.get_db();

        let marketplace = Marketplace::find_by_id(new.marketplace_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Marketplace", new.marketplace_id))?;

        if marketplace.component != new.component {
            return Err(ServiceError::InvariantViolation(format!(
                "marketplace {} belongs to {}, not {}",
                marketplace.id, marketplace.component, new.component
            )));
        }

        let account = account::ActiveModel {
            title: Set(new.title),
            component: Set(new.component),
            marketplace_id: Set(new.marketplace_id),
            server_hash: Set(new.server_hash),
            user_id: Set(new.user_id),
            credentials: Set(new.credentials),
            is_active: Set(true),
            token_expired_date: Set(None),
            orders_last_synchronization: Set(None),
            inventory_last_synchronization: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(account_id = account.id, marketplace_id = account.marketplace_id, "Account created");
        Ok(account)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<AccountModel>, AppError> {
        Account::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn require(&self, id: i32) -> Result<AccountModel, AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Account", id))
    }

    pub async fn list_by_component(
        &self,
        component: Component,
        only_active: bool,
    ) -> Result<Vec<AccountModel>, AppError> {
        let mut query = Account::find().filter(Column::Component.eq(component));
        if only_active {
            query = query.filter(Column::IsActive.eq(true));
        }
        query
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Replaces the credential blob, e.g. after a token refresh.
    pub async fn update_credentials(
        &self,
        id: i32,
        credentials: Json,
        token_expired_date: Option<DateTime<Utc>>,
    ) -> Result<AccountModel, AppError> {
        let mut account = self.require(id).await?.into_active_model();
        account.credentials = Set(credentials);
        account.token_expired_date = Set(token_expired_date);
        Ok(account.update(self.base.get_db()).await?)
    }

    pub async fn touch_orders_sync(&self, id: i32, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut account = self.require(id).await?.into_active_model();
        account.orders_last_synchronization = Set(Some(at));
        account.update(self.base.get_db()).await?;
        Ok(())
    }

    pub async fn touch_inventory_sync(&self, id: i32, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut account = self.require(id).await?.into_active_model();
        account.inventory_last_synchronization = Set(Some(at));
        account.update(self.base.get_db()).await?;
        Ok(())
    }

    pub async fn set_active(&self, id: i32, active: bool) -> Result<AccountModel, AppError> {
        let mut account = self.require(id).await?.into_active_model();
        account.is_active = Set(active);
        let account = account.update(self.base.get_db()).await?;
        info!(account_id = id, active, "Account state changed");
        Ok(account)
    }
}

impl Repository for AccountRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
