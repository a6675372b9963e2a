//! Shared handle over the database with the process limits applied.

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::entities::listing_product_instruction::Model as InstructionModel;
use crate::errors::AppError;
use crate::repositories::{
    AccountRepository, ConfigRepository, CreationAttempt, InstructionRepository,
    ListingProductRepository, ListingRepository, LogRepository, OrderRepository,
    ProcessingRepository, RequestPendingPartialRepository, RequestPendingSingleRepository,
};
use crate::settings::StoreSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub processing_ttl: Duration,
    pub request_pending_ttl: Duration,
    pub instruction_batch_size: u64,
    pub order_creation_max_attempts: i32,
    pub order_creation_attempt_timeout: Duration,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self::from(&AppConfig::new(String::new(), String::new()))
    }
}

impl From<&AppConfig> for StoreLimits {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            processing_ttl: cfg.processing_ttl(),
            request_pending_ttl: cfg.request_pending_ttl(),
            instruction_batch_size: cfg.instruction_batch_size,
            order_creation_max_attempts: cfg.order_creation_max_attempts,
            order_creation_attempt_timeout: cfg.order_creation_attempt_timeout(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    db: Arc<DatabaseConnection>,
    limits: StoreLimits,
}

impl Store {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            limits: StoreLimits::default(),
        }
    }

    pub fn from_config(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        Self {
            db,
            limits: StoreLimits::from(config),
        }
    }

    pub fn db(&self) -> Arc<DatabaseConnection> {
        self.db.clone()
    }

    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    pub fn config(&self) -> ConfigRepository {
        ConfigRepository::new(self.db.clone())
    }

    pub async fn settings(&self) -> Result<StoreSettings, AppError> {
        StoreSettings::load(&self.config()).await
    }

    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new(self.db.clone())
    }

    pub fn listings(&self) -> ListingRepository {
        ListingRepository::new(self.db.clone())
    }

    pub fn listing_products(&self) -> ListingProductRepository {
        ListingProductRepository::new(self.db.clone())
    }

    pub fn instructions(&self) -> InstructionRepository {
        InstructionRepository::new(self.db.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.db.clone())
    }

    pub fn logs(&self) -> LogRepository {
        LogRepository::new(self.db.clone())
    }

    pub fn processings(&self) -> ProcessingRepository {
        ProcessingRepository::new(self.db.clone()).with_default_ttl(self.limits.processing_ttl)
    }

    pub fn single_requests(&self) -> RequestPendingSingleRepository {
        RequestPendingSingleRepository::new(self.db.clone())
            .with_default_ttl(self.limits.request_pending_ttl)
    }

    pub fn partial_requests(&self) -> RequestPendingPartialRepository {
        RequestPendingPartialRepository::new(self.db.clone())
            .with_default_ttl(self.limits.request_pending_ttl)
    }

    /// Due instructions, at most one configured batch.
    pub async fn pending_instructions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<InstructionModel>, AppError> {
        self.instructions()
            .pending(now, self.limits.instruction_batch_size)
            .await
    }

    pub async fn claim_instructions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<InstructionModel>, AppError> {
        self.instructions()
            .claim_batch(now, self.limits.instruction_batch_size)
            .await
    }

    /// Starts a local order creation under the configured attempt policy.
    pub async fn begin_order_creation(
        &self,
        order_id: i32,
        now: DateTime<Utc>,
    ) -> Result<CreationAttempt, AppError> {
        self.orders()
            .begin_creation_attempt(
                order_id,
                now,
                self.limits.order_creation_max_attempts,
                self.limits.order_creation_attempt_timeout,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_follow_config() {
        let mut cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        cfg.instruction_batch_size = 25;
        cfg.order_creation_max_attempts = 5;
        cfg.processing_default_ttl_secs = 60;

        let limits = StoreLimits::from(&cfg);
        assert_eq!(limits.instruction_batch_size, 25);
        assert_eq!(limits.order_creation_max_attempts, 5);
        assert_eq!(limits.processing_ttl, Duration::from_secs(60));
    }

    #[test]
    fn default_limits() {
        let limits = StoreLimits::default();
        assert_eq!(limits.instruction_batch_size, 1000);
        assert_eq!(limits.order_creation_max_attempts, 3);
        assert_eq!(limits.order_creation_attempt_timeout, Duration::from_secs(15 * 60));
        assert_eq!(limits.request_pending_ttl, Duration::from_secs(24 * 60 * 60));
    }
}
