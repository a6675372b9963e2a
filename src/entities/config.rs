use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Hierarchical key/value store addressed by (`group`, `key`).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Slash-delimited path, always `/`-prefixed and `/`-suffixed.
    pub group: String,
    pub key: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub value: Option<String>,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
