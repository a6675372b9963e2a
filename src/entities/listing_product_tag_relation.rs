use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_listing_product_tag_relation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub listing_product_id: i32,
    pub tag_id: i32,
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
    #[sea_orm(
        belongs_to = "super::tag::Entity",
        from = "Column::TagId",
        to = "super::tag::Column::Id"
    )]
    Tag,
}

impl Related<super::listing_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListingProduct.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
