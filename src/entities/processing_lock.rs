use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Exclusive claim of a processing run over one `(model_name, object_id)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_processing_lock")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub processing_id: i32,
    pub model_name: String,
    pub object_id: i32,
    pub tag: Option<String>,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::processing::Entity",
        from = "Column::ProcessingId",
        to = "super::processing::Column::Id"
    )]
    Processing,
}

impl Related<super::processing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Processing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
