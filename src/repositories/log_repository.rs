use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::entities::common::{Component, Initiator, LogType};
use crate::entities::{listing_log, order_log, synchronization_log, system_log};
use crate::errors::{AppError, ServiceError};
use crate::repositories::{ConfigRepository, Repository};
use crate::settings::{RetentionPolicy, StoreSettings};

use super::BaseRepository;

const ACTION_ID_PATH: &str = "/logs/listings/";
const ACTION_ID_KEY: &str = "last_action_id";
const DEFAULT_PAGE: u64 = 100;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogKind {
    Listings,
    Orders,
    Synchronizations,
    System,
}

impl LogKind {
    pub const ALL: [LogKind; 4] = [
        LogKind::Listings,
        LogKind::Orders,
        LogKind::Synchronizations,
        LogKind::System,
    ];

    fn retention(self, settings: &StoreSettings) -> RetentionPolicy {
        let clearing = &settings.logs_clearing;
        match self {
            Self::Listings => clearing.listings,
            Self::Orders => clearing.orders,
            Self::Synchronizations => clearing.synchronizations,
            Self::System => clearing.system,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListingLog {
    pub account_id: Option<i32>,
    pub marketplace_id: Option<i32>,
    pub listing_id: Option<i32>,
    pub listing_title: Option<String>,
    pub product_id: Option<i32>,
    pub product_title: Option<String>,
    pub listing_product_id: Option<i32>,
    pub parent_listing_product_id: Option<i32>,
    pub component: Component,
    /// Allocated from the shared counter when absent
    pub action_id: Option<i32>,
    pub action: String,
    pub initiator: Initiator,
    pub log_type: LogType,
    pub description: String,
    pub additional_data: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderLog {
    pub account_id: Option<i32>,
    pub marketplace_id: Option<i32>,
    pub order_id: Option<i32>,
    pub component: Component,
    pub initiator: Initiator,
    pub log_type: LogType,
    pub description: String,
    pub additional_data: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSynchronizationLog {
    pub operation_history_id: Option<i32>,
    pub task: Option<String>,
    pub initiator: Initiator,
    pub log_type: LogType,
    pub description: String,
    pub detailed_description: Option<String>,
    pub additional_data: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSystemLog {
    pub class: String,
    pub log_type: LogType,
    pub description: String,
    pub detailed_description: Option<String>,
    pub additional_data: Option<Json>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingLogFilter {
    pub listing_id: Option<i32>,
    pub listing_product_id: Option<i32>,
    pub action_id: Option<i32>,
    pub log_type: Option<LogType>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogPruneReport {
    pub listings: u64,
    pub orders: u64,
    pub synchronizations: u64,
    pub system: u64,
}

impl LogPruneReport {
    pub fn total(&self) -> u64 {
        self.listings + self.orders + self.synchronizations + self.system
    }

    fn record(&mut self, kind: LogKind, removed: u64) {
        match kind {
            LogKind::Listings => self.listings = removed,
            LogKind::Orders => self.orders = removed,
            LogKind::Synchronizations => self.synchronizations = removed,
            LogKind::System => self.system = removed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogRepository {
    base: BaseRepository,
    config: ConfigRepository,
}

impl LogRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            config: ConfigRepository::new(db.clone()),
            base: BaseRepository::new(db),
        }
    }

    /// Next id for grouping the listing log rows of one action.
    pub async fn next_action_id(&self) -> Result<i32, AppError> {
        let next = self.config.increment(ACTION_ID_PATH, ACTION_ID_KEY).await?;
        i32::try_from(next).map_err(|_| {
            ServiceError::InternalError(format!("listing log action id {} overflowed", next))
        })
    }

    #[instrument(skip(self, log), fields(action = %log.action))]
    pub async fn add_listing_log(&self, log: NewListingLog) -> Result<listing_log::Model, AppError> {
        let action_id = match log.action_id {
            Some(id) => id,
            None => self.next_action_id().await?,
        };

        let model = listing_log::ActiveModel {
            account_id: Set(log.account_id),
            marketplace_id: Set(log.marketplace_id),
            listing_id: Set(log.listing_id),
            listing_title: Set(log.listing_title),
            product_id: Set(log.product_id),
            product_title: Set(log.product_title),
            listing_product_id: Set(log.listing_product_id),
            parent_listing_product_id: Set(log.parent_listing_product_id),
            component: Set(log.component),
            action_id: Set(Some(action_id)),
            action: Set(log.action),
            initiator: Set(log.initiator),
            log_type: Set(log.log_type),
            description: Set(log.description),
            additional_data: Set(log.additional_data),
            create_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.base.get_db())
        .await?;

        counter!("m2e_store.log.written", 1, "kind" => "listings");
        Ok(model)
    }

    pub async fn add_order_log(&self, log: NewOrderLog) -> Result<order_log::Model, AppError> {
        let model = order_log::ActiveModel {
            account_id: Set(log.account_id),
            marketplace_id: Set(log.marketplace_id),
            order_id: Set(log.order_id),
            component: Set(log.component),
            initiator: Set(log.initiator),
            log_type: Set(log.log_type),
            description: Set(log.description),
            additional_data: Set(log.additional_data),
            create_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.base.get_db())
        .await?;

        counter!("m2e_store.log.written", 1, "kind" => "orders");
        Ok(model)
    }

    pub async fn add_synchronization_log(
        &self,
        log: NewSynchronizationLog,
    ) -> Result<synchronization_log::Model, AppError> {
        let model = synchronization_log::ActiveModel {
            operation_history_id: Set(log.operation_history_id),
            task: Set(log.task),
            initiator: Set(log.initiator),
            log_type: Set(log.log_type),
            description: Set(log.description),
            detailed_description: Set(log.detailed_description),
            additional_data: Set(log.additional_data),
            create_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.base.get_db())
        .await?;

        counter!("m2e_store.log.written", 1, "kind" => "synchronizations");
        Ok(model)
    }

    pub async fn add_system_log(&self, log: NewSystemLog) -> Result<system_log::Model, AppError> {
        let model = system_log::ActiveModel {
            class: Set(log.class),
            log_type: Set(log.log_type),
            description: Set(log.description),
            detailed_description: Set(log.detailed_description),
            additional_data: Set(log.additional_data),
            update_date: Set(None),
            create_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.base.get_db())
        .await?;

        counter!("m2e_store.log.written", 1, "kind" => "system");
        Ok(model)
    }

    /// Newest first.
    pub async fn listing_logs(
        &self,
        filter: ListingLogFilter,
    ) -> Result<Vec<listing_log::Model>, AppError> {
        let mut query = listing_log::Entity::find();
        if let Some(listing_id) = filter.listing_id {
            query = query.filter(listing_log::Column::ListingId.eq(listing_id));
        }
        if let Some(listing_product_id) = filter.listing_product_id {
            query = query.filter(listing_log::Column::ListingProductId.eq(listing_product_id));
        }
        if let Some(action_id) = filter.action_id {
            query = query.filter(listing_log::Column::ActionId.eq(action_id));
        }
        if let Some(log_type) = filter.log_type {
            query = query.filter(listing_log::Column::LogType.eq(log_type));
        }

        query
            .order_by_desc(listing_log::Column::CreateDate)
            .order_by_desc(listing_log::Column::Id)
            .limit(filter.limit.unwrap_or(DEFAULT_PAGE))
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn order_logs(&self, order_id: i32) -> Result<Vec<order_log::Model>, AppError> {
        order_log::Entity::find()
            .filter(order_log::Column::OrderId.eq(order_id))
            .order_by_desc(order_log::Column::CreateDate)
            .order_by_desc(order_log::Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Deletes rows of `kind` created before `older_than`.
    #[instrument(skip(self))]
    pub async fn prune(&self, kind: LogKind, older_than: DateTime<Utc>) -> Result<u64, AppError> {
        let db = self.base.get_db();
        let removed = match kind {
            LogKind::Listings => {
                listing_log::Entity::delete_many()
                    .filter(listing_log::Column::CreateDate.lt(older_than))
                    .exec(db)
                    .await?
            }
            LogKind::Orders => {
                order_log::Entity::delete_many()
                    .filter(order_log::Column::CreateDate.lt(older_than))
                    .exec(db)
                    .await?
            }
            LogKind::Synchronizations => {
                synchronization_log::Entity::delete_many()
                    .filter(synchronization_log::Column::CreateDate.lt(older_than))
                    .exec(db)
                    .await?
            }
            LogKind::System => {
                system_log::Entity::delete_many()
                    .filter(system_log::Column::CreateDate.lt(older_than))
                    .exec(db)
                    .await?
            }
        }
        .rows_affected;

        if removed > 0 {
            info!(kind = %kind, removed, "Logs pruned");
        }
        Ok(removed)
    }

    /// Prunes every log kind whose retention is enabled.
    pub async fn prune_by_settings(
        &self,
        settings: &StoreSettings,
        now: DateTime<Utc>,
    ) -> Result<LogPruneReport, AppError> {
        let mut report = LogPruneReport::default();
        for kind in LogKind::ALL {
            if let Some(max_age) = kind.retention(settings).max_age() {
                report.record(kind, self.prune(kind, now - max_age).await?);
            }
        }
        Ok(report)
    }
}

impl Repository for LogRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::str::FromStr;

    #[test]
    fn retention_follows_settings() {
        let settings = StoreSettings::from_values(&HashMap::new()).unwrap();
        assert_eq!(LogKind::Orders.retention(&settings).days, 90);
        assert_eq!(LogKind::System.retention(&settings).days, 30);
    }

    #[test]
    fn kinds_parse_from_names() {
        assert_eq!(LogKind::from_str("synchronizations").unwrap(), LogKind::Synchronizations);
        assert!(LogKind::from_str("audit").is_err());
    }
}
