use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common::Component;

/// A pending unit of work against a listing product.
///
/// Consumers read in `priority ASC, create_date ASC` order and delete what they claim.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_listing_product_instruction")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub listing_product_id: i32,
    pub component: Component,
    #[sea_orm(column_name = "type")]
    pub instruction_type: String,
    pub initiator: String,
    pub priority: i32,
    pub skip_until: Option<DateTime<Utc>>,
    pub additional_data: Option<Json>,
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
