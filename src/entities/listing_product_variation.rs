use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::listing_product::ListingProductStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_listing_product_variation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub listing_product_id: i32,
    pub online_sku: Option<String>,
    pub online_price: Option<Decimal>,
    pub online_qty: Option<i32>,
    pub status: ListingProductStatus,
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
    #[sea_orm(has_many = "super::listing_product_variation_option::Entity")]
    Option,
}

impl Related<super::listing_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListingProduct.def()
    }
}

impl Related<super::listing_product_variation_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Option.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
