use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Condition, Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use crate::entities::account;
use crate::entities::order::{self, Column, Entity as Order, Model as OrderModel, ReservationState};
use crate::entities::order_item::{self, Entity as OrderItem, Model as OrderItemModel};
use crate::errors::{AppError, ServiceError};
use crate::repositories::processing_repository::to_chrono;
use crate::repositories::Repository;

use super::BaseRepository;

/// Order as reported by a marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewOrder {
    pub account_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub channel_order_id: String,
    pub store_id: Option<i32>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub paid_amount: Decimal,
    pub status: String,
    pub purchase_create_date: Option<DateTime<Utc>>,
    pub additional_data: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewOrderItem {
    pub order_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub channel_item_id: String,
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(range(min = 1))]
    pub qty_purchased: i32,
    pub price: Decimal,
    pub tax_details: Option<Json>,
    pub shipping_details: Option<Json>,
    pub fee_details: Option<Json>,
    pub product_id: Option<i32>,
}

/// Result of trying to start a local order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreationAttempt {
    /// The caller owns this attempt and must report success or failure
    Claimed(OrderModel),
    AlreadyCreated { magento_order_id: i32 },
    /// Another attempt started within the timeout and has not reported back
    InFlight,
    GaveUp { fails_count: i32 },
}

#[derive(Debug, Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Inserts the order or refreshes the marketplace-owned fields of the existing one.
    ///
    /// Reservation and local-order bookkeeping are never touched here.
    #[instrument(skip(self, new), fields(account_id = new.account_id, channel_order_id = %new.channel_order_id))]
    pub async fn upsert_from_channel(&self, new: NewOrder) -> Result<OrderModel, AppError> {
        new.validate()?;
        let db = self.base.get_db();

        let account = account::Entity::find_by_id(new.account_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Account", new.account_id))?;

        let now = Utc::now();
        let model = order::ActiveModel {
            account_id: Set(account.id),
            marketplace_id: Set(account.marketplace_id),
            component: Set(account.component),
            channel_order_id: Set(new.channel_order_id.clone()),
            store_id: Set(new.store_id),
            buyer_name: Set(new.buyer_name),
            buyer_email: Set(new.buyer_email),
            currency: Set(new.currency),
            paid_amount: Set(new.paid_amount),
            status: Set(new.status),
            reservation_state: Set(ReservationState::NotProcessed),
            reservation_start_date: Set(None),
            magento_order_id: Set(None),
            magento_order_creation_failure: Set(false),
            magento_order_creation_fails_count: Set(0),
            magento_order_creation_latest_attempt_date: Set(None),
            purchase_create_date: Set(new.purchase_create_date),
            additional_data: Set(new.additional_data),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        Order::insert(model)
            .on_conflict(
                OnConflict::columns([Column::AccountId, Column::ChannelOrderId])
                    .update_columns([
                        Column::BuyerName,
                        Column::BuyerEmail,
                        Column::Currency,
                        Column::PaidAmount,
                        Column::Status,
                        Column::PurchaseCreateDate,
                        Column::AdditionalData,
                        Column::UpdateDate,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        let order = self
            .find_by_channel_id(account.id, &new.channel_order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "order {} vanished after upsert",
                    new.channel_order_id
                ))
            })?;
        debug!(order_id = order.id, "Order synchronised from channel");
        Ok(order)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<OrderModel>, AppError> {
        Order::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn require(&self, id: i32) -> Result<OrderModel, AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", id))
    }

    pub async fn find_by_channel_id(
        &self,
        account_id: i32,
        channel_order_id: &str,
    ) -> Result<Option<OrderModel>, AppError> {
        Order::find()
            .filter(Column::AccountId.eq(account_id))
            .filter(Column::ChannelOrderId.eq(channel_order_id))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Adds a line, or refreshes it when the marketplace reports it again.
    pub async fn add_item(&self, item: NewOrderItem) -> Result<OrderItemModel, AppError> {
        item.validate()?;
        let db = self.base.get_db();
        self.require(item.order_id).await?;

        let now = Utc::now();
        let (order_id, channel_item_id) = (item.order_id, item.channel_item_id.clone());
        let model = order_item::ActiveModel {
            order_id: Set(item.order_id),
            channel_item_id: Set(item.channel_item_id),
            sku: Set(item.sku),
            title: Set(item.title),
            qty_purchased: Set(item.qty_purchased),
            price: Set(item.price),
            tax_details: Set(item.tax_details),
            shipping_details: Set(item.shipping_details),
            fee_details: Set(item.fee_details),
            product_id: Set(item.product_id),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        OrderItem::insert(model)
            .on_conflict(
                OnConflict::columns([order_item::Column::OrderId, order_item::Column::ChannelItemId])
                    .update_columns([
                        order_item::Column::Sku,
                        order_item::Column::Title,
                        order_item::Column::QtyPurchased,
                        order_item::Column::Price,
                        order_item::Column::TaxDetails,
                        order_item::Column::ShippingDetails,
                        order_item::Column::FeeDetails,
                        order_item::Column::ProductId,
                        order_item::Column::UpdateDate,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .filter(order_item::Column::ChannelItemId.eq(channel_item_id.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("OrderItem", channel_item_id))
    }

    pub async fn items(&self, order_id: i32) -> Result<Vec<OrderItemModel>, AppError> {
        OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn place_reservation(&self, id: i32, now: DateTime<Utc>) -> Result<OrderModel, AppError> {
        self.transition_reservation(id, ReservationState::Placed, Some(now))
            .await
    }

    pub async fn release_reservation(&self, id: i32) -> Result<OrderModel, AppError> {
        self.transition_reservation(id, ReservationState::Released, None)
            .await
    }

    pub async fn cancel_reservation(&self, id: i32) -> Result<OrderModel, AppError> {
        self.transition_reservation(id, ReservationState::Canceled, None)
            .await
    }

    /// Moves the reservation forward, guarded on the state it was read in.
    #[instrument(skip(self))]
    async fn transition_reservation(
        &self,
        id: i32,
        next: ReservationState,
        start_date: Option<DateTime<Utc>>,
    ) -> Result<OrderModel, AppError> {
        let current = self.require(id).await?;
        let from = current.reservation_state;
        if !from.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} reservation cannot move from {} to {}",
                id, from, next
            )));
        }

        let mut update = Order::update_many()
            .col_expr(Column::ReservationState, Expr::value(next))
            .col_expr(Column::UpdateDate, Utc::now().into());
        if let Some(date) = start_date {
            update = update.col_expr(Column::ReservationStartDate, Some(date).into());
        }
        let result = update
            .filter(Column::Id.eq(id))
            .filter(Column::ReservationState.eq(from))
            .exec(self.base.get_db())
            .await?;

        if result.rows_affected != 1 {
            return Err(ServiceError::Conflict(format!(
                "order {} reservation changed concurrently",
                id
            )));
        }
        info!(order_id = id, from = %from, to = %next, "Reservation state changed");
        self.require(id).await
    }

    /// Claims the right to create the local order.
    ///
    /// The claim is one guarded update: the order must not be created yet,
    /// must have failed fewer than `max_attempts` times, and no other attempt
    /// may have started within `timeout` without reporting a failure.
    #[instrument(skip(self))]
    pub async fn begin_creation_attempt(
        &self,
        id: i32,
        now: DateTime<Utc>,
        max_attempts: i32,
        timeout: Duration,
    ) -> Result<CreationAttempt, AppError> {
        let cutoff = now - to_chrono(timeout)?;
        let result = Order::update_many()
            .col_expr(Column::MagentoOrderCreationLatestAttemptDate, Some(now).into())
            .col_expr(Column::MagentoOrderCreationFailure, false.into())
            .col_expr(Column::UpdateDate, now.into())
            .filter(Column::Id.eq(id))
            .filter(Column::MagentoOrderId.is_null())
            .filter(Column::MagentoOrderCreationFailsCount.lt(max_attempts))
            .filter(
                Condition::any()
                    .add(Column::MagentoOrderCreationLatestAttemptDate.is_null())
                    .add(Column::MagentoOrderCreationLatestAttemptDate.lte(cutoff))
                    .add(Column::MagentoOrderCreationFailure.eq(true)),
            )
            .exec(self.base.get_db())
            .await?;

        let order = self.require(id).await?;
        if result.rows_affected == 1 {
            counter!("m2e_store.order.creation_claimed", 1);
            return Ok(CreationAttempt::Claimed(order));
        }

        Ok(match order.magento_order_id {
            Some(magento_order_id) => CreationAttempt::AlreadyCreated { magento_order_id },
            None if order.magento_order_creation_fails_count >= max_attempts => {
                CreationAttempt::GaveUp {
                    fails_count: order.magento_order_creation_fails_count,
                }
            }
            None => CreationAttempt::InFlight,
        })
    }

    /// Counts the failure of the attempt in flight. Rejected when no attempt
    /// was claimed since the last report or the local order exists.
    #[instrument(skip(self))]
    pub async fn record_creation_failure(
        &self,
        id: i32,
        now: DateTime<Utc>,
    ) -> Result<OrderModel, AppError> {
        let result = Order::update_many()
            .col_expr(
                Column::MagentoOrderCreationFailsCount,
                Expr::col(Column::MagentoOrderCreationFailsCount).add(1),
            )
            .col_expr(Column::MagentoOrderCreationFailure, true.into())
            .col_expr(Column::MagentoOrderCreationLatestAttemptDate, Some(now).into())
            .col_expr(Column::UpdateDate, now.into())
            .filter(Column::Id.eq(id))
            .filter(Column::MagentoOrderId.is_null())
            .filter(Column::MagentoOrderCreationFailure.eq(false))
            .filter(Column::MagentoOrderCreationLatestAttemptDate.is_not_null())
            .exec(self.base.get_db())
            .await?;

        let order = self.require(id).await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::InvalidStatus(match order.magento_order_id {
                Some(_) => format!("order {} already has a local order", id),
                None => format!("order {} has no creation attempt in flight", id),
            }));
        }
        counter!("m2e_store.order.creation_failed", 1);
        error!(
            order_id = id,
            fails_count = order.magento_order_creation_fails_count,
            "Local order creation failed"
        );
        Ok(order)
    }

    pub async fn record_creation_success(
        &self,
        id: i32,
        magento_order_id: i32,
    ) -> Result<OrderModel, AppError> {
        let result = Order::update_many()
            .col_expr(Column::MagentoOrderId, Some(magento_order_id).into())
            .col_expr(Column::MagentoOrderCreationFailure, false.into())
            .col_expr(Column::UpdateDate, Utc::now().into())
            .filter(Column::Id.eq(id))
            .filter(Column::MagentoOrderId.is_null())
            .exec(self.base.get_db())
            .await?;

        let order = self.require(id).await?;
        if result.rows_affected != 1 {
            warn!(order_id = id, "Local order reported twice");
            return Err(ServiceError::InvalidStatus(format!(
                "order {} already has local order {}",
                id,
                order.magento_order_id.unwrap_or_default()
            )));
        }
        counter!("m2e_store.order.created", 1);
        Ok(order)
    }
}

impl Repository for OrderRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
