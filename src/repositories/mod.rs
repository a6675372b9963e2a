use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod account_repository;
pub mod config_repository;
pub mod instruction_repository;
pub mod listing_product_repository;
pub mod listing_repository;
pub mod lock_repository;
pub mod log_repository;
pub mod marketplace_repository;
pub mod order_change_repository;
pub mod order_repository;
pub mod processing_repository;
pub mod request_pending_repository;
pub mod scheduled_action_repository;
pub mod tag_repository;
pub mod template_repository;
pub mod variation_repository;
pub mod wizard_repository;

pub use account_repository::{AccountRepository, NewAccount};
pub use config_repository::ConfigRepository;
pub use instruction_repository::{InstructionRepository, NewInstruction};
pub use listing_product_repository::{AddProductOutcome, ListingProductRepository, OnlineState};
pub use listing_repository::{ListingRepository, ListingTemplates, NewListing};
pub use lock_repository::{
    LockAcquisition, LockItemRepository, LockTransactionalRepository, ProcessingLockRepository,
};
pub use log_repository::{
    ListingLogFilter, LogKind, LogPruneReport, LogRepository, NewListingLog, NewOrderLog,
    NewSynchronizationLog, NewSystemLog,
};
pub use marketplace_repository::{MarketplaceCapabilities, MarketplaceRepository};
pub use order_change_repository::{EnqueueOutcome, OrderChangeRepository};
pub use order_repository::{CreationAttempt, NewOrder, NewOrderItem, OrderRepository};
pub use processing_repository::{NewProcessing, ProcessingRepository, ProcessingState};
pub use request_pending_repository::{
    RequestPendingPartialRepository, RequestPendingSingleRepository, RequestState,
};
pub use scheduled_action_repository::{NewScheduledAction, ScheduledActionRepository};
pub use tag_repository::TagRepository;
pub use template_repository::{NewTemplate, TemplateRepository};
pub use variation_repository::{
    NewVariation, VariationOptionInput, VariationRepository, VariationWithOptions,
};
pub use wizard_repository::WizardRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn shared(&self) -> Arc<DatabaseConnection> {
        self.db.clone()
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
