use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::Component;

/// Which listing slot a template bundle fills.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemplateNick {
    #[sea_orm(string_value = "selling_format")]
    SellingFormat,
    #[sea_orm(string_value = "shipping")]
    Shipping,
    #[sea_orm(string_value = "description")]
    Description,
    #[sea_orm(string_value = "synchronization")]
    Synchronization,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_template")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub nick: TemplateNick,
    pub component: Component,
    pub title: String,
    /// Custom templates belong to a single listing product and are hidden from pickers.
    pub is_custom_template: bool,
    pub data: Json,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
