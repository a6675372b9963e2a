use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::Component;

/// Marketplace-side state of a listing product.
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ListingProductStatus {
    #[sea_orm(string_value = "not_listed")]
    NotListed,
    #[sea_orm(string_value = "unknown")]
    Unknown,
    #[sea_orm(string_value = "listed")]
    Listed,
    #[sea_orm(string_value = "hidden")]
    Hidden,
    #[sea_orm(string_value = "sold")]
    Sold,
    #[sea_orm(string_value = "stopped")]
    Stopped,
    #[sea_orm(string_value = "finished")]
    Finished,
    #[sea_orm(string_value = "blocked")]
    Blocked,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

/// Origin of the last status change.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusChanger {
    #[sea_orm(string_value = "unknown")]
    Unknown,
    #[sea_orm(string_value = "synch")]
    Synch,
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "component")]
    Component,
    #[sea_orm(string_value = "observer")]
    Observer,
}

/// Association between one catalog product and one listing.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_listing_product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub listing_id: i32,
    pub product_id: i32,
    pub component: Component,
    pub status: ListingProductStatus,
    pub status_changer: StatusChanger,
    /// Marketplace item identifier (eBay item id, ASIN, Walmart wpid)
    pub item_id: Option<String>,
    pub online_sku: Option<String>,
    pub online_title: Option<String>,
    pub online_price: Option<Decimal>,
    pub online_qty: Option<i32>,
    pub online_category: Option<String>,
    /// Component-specific mirror fields that have no shared column.
    pub online_details: Option<Json>,
    pub is_variation_product: bool,
    pub template_selling_format_id: Option<i32>,
    pub template_shipping_id: Option<i32>,
    pub template_description_id: Option<i32>,
    pub template_synchronization_id: Option<i32>,
    pub last_blocking_error_date: Option<DateTime<Utc>>,
    pub additional_data: Option<Json>,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::listing::Entity",
        from = "Column::ListingId",
        to = "super::listing::Column::Id"
    )]
    Listing,
    #[sea_orm(has_many = "super::listing_product_variation::Entity")]
    Variation,
    #[sea_orm(has_many = "super::listing_product_instruction::Entity")]
    Instruction,
    #[sea_orm(has_one = "super::listing_product_scheduled_action::Entity")]
    ScheduledAction,
}

impl Related<super::listing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listing.def()
    }
}

impl Related<super::listing_product_variation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variation.def()
    }
}

impl Related<super::listing_product_instruction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instruction.def()
    }
}

impl Related<super::listing_product_scheduled_action::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScheduledAction.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::listing_product_tag_relation::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(
            super::listing_product_tag_relation::Relation::ListingProduct
                .def()
                .rev(),
        )
    }
}

impl ActiveModelBehavior for ActiveModel {}
