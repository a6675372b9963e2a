use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::common::Component;

/// A connected seller account on one marketplace of one component.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_account")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub component: Component,
    pub marketplace_id: i32,
    pub server_hash: Option<String>,
    pub user_id: Option<String>,
    /// Opaque credential blob; only the marketplace client interprets it.
    #[serde(skip_serializing)]
    pub credentials: Json,
    pub is_active: bool,
    pub token_expired_date: Option<DateTime<Utc>>,
    pub orders_last_synchronization: Option<DateTime<Utc>>,
    pub inventory_last_synchronization: Option<DateTime<Utc>>,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::marketplace::Entity",
        from = "Column::MarketplaceId",
        to = "super::marketplace::Column::Id"
    )]
    Marketplace,
    #[sea_orm(has_many = "super::listing::Entity")]
    Listing,
}

impl Related<super::marketplace::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Marketplace.def()
    }
}

impl Related<super::listing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listing.def()
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
