use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::Component;

/// Marketplace reference data. Ids are assigned at seed time and never change.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_marketplace")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    /// Identifier used by the marketplace API (eBay site id, Amazon marketplace id hash, ...)
    pub native_id: String,
    pub title: String,
    pub code: String,
    pub url: String,
    pub is_enabled: bool,
    pub sorder: i32,
    pub group_title: String,
    pub component: Component,
    pub currency: String,
    pub is_vat: bool,
    pub is_tax_table: bool,
    pub is_variations: bool,
    pub is_metric_measurement: bool,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account::Entity")]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
