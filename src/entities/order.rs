use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::common::Component;

/// Stock reservation held for an order. Moves forward only.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReservationState {
    #[sea_orm(string_value = "not_processed")]
    NotProcessed,
    #[sea_orm(string_value = "placed")]
    Placed,
    #[sea_orm(string_value = "released")]
    Released,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

impl ReservationState {
    pub fn can_transition_to(self, next: ReservationState) -> bool {
        matches!(
            (self, next),
            (Self::NotProcessed, Self::Placed)
                | (Self::NotProcessed, Self::Canceled)
                | (Self::Placed, Self::Released)
                | (Self::Placed, Self::Canceled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Released | Self::Canceled)
    }
}

/// A marketplace order mirrored locally.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m2epro_order")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub account_id: i32,
    pub marketplace_id: i32,
    pub component: Component,
    pub channel_order_id: String,
    pub store_id: Option<i32>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub currency: String,
    pub paid_amount: Decimal,
    /// Marketplace status text, not interpreted here
    pub status: String,
    pub reservation_state: ReservationState,
    pub reservation_start_date: Option<DateTime<Utc>>,
    pub magento_order_id: Option<i32>,
    pub magento_order_creation_failure: bool,
    pub magento_order_creation_fails_count: i32,
    pub magento_order_creation_latest_attempt_date: Option<DateTime<Utc>>,
    pub purchase_create_date: Option<DateTime<Utc>>,
    pub additional_data: Option<Json>,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::order_change::Entity")]
    OrderChange,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::order_change::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderChange.def()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_moves_forward_only() {
        use ReservationState::*;
        assert!(NotProcessed.can_transition_to(Placed));
        assert!(Placed.can_transition_to(Released));
        assert!(Placed.can_transition_to(Canceled));
        assert!(!Released.can_transition_to(Placed));
        assert!(!Canceled.can_transition_to(NotProcessed));
        assert!(!Placed.can_transition_to(Placed));
        assert!(!NotProcessed.can_transition_to(Released));
    }
}
