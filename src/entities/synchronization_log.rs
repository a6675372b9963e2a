use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::{Initiator, LogType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_synchronization_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub operation_history_id: Option<i32>,
    /// Synchronization task nick, e.g. `ebay/other_listings`
    pub task: Option<String>,
    pub initiator: Initiator,
    #[sea_orm(column_name = "type")]
    pub log_type: LogType,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub detailed_description: Option<String>,
    pub additional_data: Option<Json>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
