use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// One install or upgrade run. `is_completed` is the health signal of the store.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_setup")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub version_from: Option<String>,
    pub version_to: String,
    pub is_backuped: bool,
    pub is_completed: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub profiler_data: Option<String>,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            active_model.create_date = Set(now);
        }
        active_model.update_date = Set(now);
        Ok(active_model)
    }
}
