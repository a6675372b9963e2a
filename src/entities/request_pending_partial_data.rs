use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_request_pending_partial_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub request_pending_partial_id: i32,
    pub part_number: i32,
    pub data: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::request_pending_partial::Entity",
        from = "Column::RequestPendingPartialId",
        to = "super::request_pending_partial::Column::Id"
    )]
    Request,
}

impl Related<super::request_pending_partial::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
