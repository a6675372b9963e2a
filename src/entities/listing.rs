use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::common::Component;

/// How products get added to a listing without user action.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AutoMode {
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "global")]
    Global,
    #[sea_orm(string_value = "website")]
    Website,
    #[sea_orm(string_value = "category")]
    Category,
}

/// A seller-defined grouping of products targeted at one account.
///
/// `marketplace_id` always equals the owning account's marketplace.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_listing")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub account_id: i32,
    pub marketplace_id: i32,
    pub component: Component,
    pub title: String,
    pub store_id: i32,
    pub template_selling_format_id: Option<i32>,
    pub template_shipping_id: Option<i32>,
    pub template_description_id: Option<i32>,
    pub template_synchronization_id: Option<i32>,
    pub auto_mode: AutoMode,
    pub auto_global_adding_mode: bool,
    pub auto_website_adding_mode: bool,
    pub additional_data: Option<Json>,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
    #[sea_orm(has_many = "super::listing_product::Entity")]
    ListingProduct,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::listing_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListingProduct.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            active_model.create_date = Set(now);
        }
        active_model.update_date = Set(now);
        Ok(active_model)
    }
}
