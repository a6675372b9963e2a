use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::Component;

/// Paged continuation. `next_part` starts at 1 and names the page expected next.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_request_pending_partial")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub component: Component,
    pub server_hash: String,
    pub next_part: i32,
    pub result_messages: Option<Json>,
    pub expiration_date: DateTime<Utc>,
    pub is_completed: bool,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::request_pending_partial_data::Entity")]
    Data,
}

impl Related<super::request_pending_partial_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Data.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
