use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One tracked asynchronous task.
///
/// A record that is not completed and past `expiration_date` is abandoned.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_processing")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Logical task type, e.g. `Ebay_Listing_Product_Action_List`
    pub model: String,
    pub params: Json,
    pub result_data: Option<Json>,
    pub result_messages: Option<Json>,
    pub is_completed: bool,
    pub expiration_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

impl Model {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.expiration_date <= now
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::processing_lock::Entity")]
    Lock,
}

impl Related<super::processing_lock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lock.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
