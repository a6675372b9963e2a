use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::Component;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderChangeAction {
    #[sea_orm(string_value = "update_shipping")]
    UpdateShipping,
    #[sea_orm(string_value = "cancel")]
    Cancel,
    #[sea_orm(string_value = "refund")]
    Refund,
    #[sea_orm(string_value = "send_invoice")]
    SendInvoice,
}

/// Pending mutation against a marketplace order. `hash` de-duplicates identical changes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_order_change")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_id: i32,
    pub component: Component,
    pub action: OrderChangeAction,
    pub params: Json,
    pub processing_attempt_count: i32,
    pub processing_attempt_date: Option<DateTime<Utc>>,
    #[sea_orm(unique)]
    pub hash: String,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
