use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::info;

use crate::entities::wizard::{Column, Entity as Wizard, Model as WizardModel, WizardStatus};
use crate::errors::{AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

#[derive(Debug, Clone)]
pub struct WizardRepository {
    base: BaseRepository,
}

impl WizardRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find(&self, nick: &str) -> Result<Option<WizardModel>, AppError> {
        Wizard::find()
            .filter(Column::Nick.eq(nick))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    async fn require(&self, nick: &str) -> Result<WizardModel, AppError> {
        self.find(nick)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Wizard '{}' not found", nick)))
    }

    /// Ordered by priority.
    pub async fn list(&self) -> Result<Vec<WizardModel>, AppError> {
        Wizard::find()
            .order_by_asc(Column::Priority)
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn set_status(&self, nick: &str, status: WizardStatus) -> Result<WizardModel, AppError> {
        let result = Wizard::update_many()
            .col_expr(Column::Status, status.into())
            .filter(Column::Nick.eq(nick))
            .exec(self.base.get_db())
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Wizard '{}' not found", nick)));
        }
        info!(nick, status = %status, "Wizard status changed");
        self.require(nick).await
    }

    pub async fn set_step(&self, nick: &str, step: Option<&str>) -> Result<WizardModel, AppError> {
        let result = Wizard::update_many()
            .col_expr(Column::Step, step.map(str::to_string).into())
            .filter(Column::Nick.eq(nick))
            .exec(self.base.get_db())
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Wizard '{}' not found", nick)));
        }
        self.require(nick).await
    }
}

impl Repository for WizardRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
