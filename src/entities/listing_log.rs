use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::{Component, Initiator, LogType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_listing_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub account_id: Option<i32>,
    pub marketplace_id: Option<i32>,
    pub listing_id: Option<i32>,
    pub listing_title: Option<String>,
    pub product_id: Option<i32>,
    pub product_title: Option<String>,
    pub listing_product_id: Option<i32>,
    pub parent_listing_product_id: Option<i32>,
    pub component: Component,
    /// Groups the rows written by one user or sync action
    pub action_id: Option<i32>,
    pub action: String,
    pub initiator: Initiator,
    #[sea_orm(column_name = "type")]
    pub log_type: LogType,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub additional_data: Option<Json>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
