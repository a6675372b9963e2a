use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::Component;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScheduledActionType {
    #[sea_orm(string_value = "list")]
    List,
    #[sea_orm(string_value = "relist")]
    Relist,
    #[sea_orm(string_value = "revise")]
    Revise,
    #[sea_orm(string_value = "stop")]
    Stop,
    #[sea_orm(string_value = "delete")]
    Delete,
}

/// The single next marketplace action for a listing product.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_listing_product_scheduled_action")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub listing_product_id: i32,
    pub component: Component,
    pub action_type: ScheduledActionType,
    pub is_force: bool,
    pub tag: Option<String>,
    /// Resolved request payload
    pub additional_data: Option<Json>,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::listing_product::Entity",
        from = "Column::ListingProductId",
        to = "super::listing_product::Column::Id"
    )]
    ListingProduct,
}

impl Related<super::listing_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListingProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
