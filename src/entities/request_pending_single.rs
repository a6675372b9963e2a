use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::Component;

/// Continuation of one outstanding remote call, keyed by `server_hash`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_request_pending_single")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub component: Component,
    pub server_hash: String,
    pub result_data: Option<Json>,
    pub result_messages: Option<Json>,
    pub expiration_date: DateTime<Utc>,
    pub is_completed: bool,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
