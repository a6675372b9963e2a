use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One attribute/option pair. Attributes are unique within a variation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_listing_product_variation_option")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub listing_product_variation_id: i32,
    pub product_id: Option<i32>,
    pub attribute: String,
    pub option: String,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::listing_product_variation::Entity",
        from = "Column::ListingProductVariationId",
        to = "super::listing_product_variation::Column::Id"
    )]
    Variation,
}

impl Related<super::listing_product_variation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
