use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Nick of the tag attached to every product that carries any error tag.
pub const HAS_ERROR_NICK: &str = "has_error";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_tag")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub nick: String,
    pub error_code: String,
    pub text: String,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::listing_product_tag_relation::Entity")]
    Relation,
}

impl Related<super::listing_product_tag_relation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Relation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
