//! Install, re-install and failure recording.

mod common;

use assert_matches::assert_matches;
use common::TestStore;
use m2e_store::{
    entities::{config, marketplace, tag, wizard},
    installer::{InstallOptions, Installer, MaintenanceMode, SCHEMA_VERSION},
    repositories::ConfigRepository,
    schema, AppError, ServiceError,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, QueryOrder, Statement};
use std::sync::{Arc, Mutex};

const EXPECTED_TABLES: &[&str] = &[
    "m2epro_account",
    "m2epro_config",
    "m2epro_listing",
    "m2epro_listing_log",
    "m2epro_listing_product",
    "m2epro_listing_product_instruction",
    "m2epro_listing_product_scheduled_action",
    "m2epro_listing_product_tag_relation",
    "m2epro_listing_product_variation",
    "m2epro_listing_product_variation_option",
    "m2epro_lock_item",
    "m2epro_lock_transactional",
    "m2epro_marketplace",
    "m2epro_migrations",
    "m2epro_order",
    "m2epro_order_change",
    "m2epro_order_item",
    "m2epro_order_log",
    "m2epro_processing",
    "m2epro_processing_lock",
    "m2epro_request_pending_partial",
    "m2epro_request_pending_partial_data",
    "m2epro_request_pending_single",
    "m2epro_setup",
    "m2epro_synchronization_log",
    "m2epro_system_log",
    "m2epro_tag",
    "m2epro_template",
    "m2epro_wizard",
];

/// Seed content without timestamps, comparable across runs.
async fn seed_snapshot(store: &TestStore) -> (Vec<(i32, String, String)>, Vec<(String, String, Option<String>)>, Vec<String>, Vec<String>) {
    let db = store.db.as_ref();
    let marketplaces = marketplace::Entity::find()
        .order_by_asc(marketplace::Column::Id)
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|m| (m.id, m.native_id, m.title))
        .collect();
    let configs = config::Entity::find()
        .order_by_asc(config::Column::Group)
        .order_by_asc(config::Column::Key)
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.group, c.key, c.value))
        .collect();
    let wizards = wizard::Entity::find()
        .order_by_asc(wizard::Column::Nick)
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.nick)
        .collect();
    let tags = tag::Entity::find()
        .order_by_asc(tag::Column::Nick)
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.nick)
        .collect();
    (marketplaces, configs, wizards, tags)
}

#[tokio::test]
async fn fresh_install_creates_schema_and_reference_data() {
    let store = TestStore::empty().await;
    let report = store
        .installer()
        .install(InstallOptions::default())
        .await
        .unwrap();

    assert_eq!(report.version_from, None);
    assert_eq!(report.version_to, SCHEMA_VERSION);
    assert!(report.applied_migrations > 0);
    assert!(report.seed.marketplaces > 0);

    let tables = schema::list_prefixed_tables(store.db.as_ref()).await.unwrap();
    assert_eq!(tables, EXPECTED_TABLES);

    let setup = store.installer().status().await.unwrap().unwrap();
    assert!(setup.is_completed);
    assert_eq!(setup.profiler_data, None);
    assert!(!store.installer().maintenance_enabled().await.unwrap());
}

#[tokio::test]
async fn installing_twice_yields_identical_schema_and_seed() {
    let store = TestStore::installed().await;
    let tables_before = schema::list_prefixed_tables(store.db.as_ref()).await.unwrap();
    let seed_before = seed_snapshot(&store).await;

    let report = store
        .installer()
        .install(InstallOptions::default())
        .await
        .unwrap();
    assert_eq!(report.applied_migrations, 0);
    assert_eq!(report.seed.total(), 0);
    assert_eq!(report.version_from.as_deref(), Some(SCHEMA_VERSION));

    assert_eq!(
        schema::list_prefixed_tables(store.db.as_ref()).await.unwrap(),
        tables_before
    );
    assert_eq!(seed_snapshot(&store).await, seed_before);
}

#[tokio::test]
async fn reinstall_drops_and_recreates_everything() {
    let store = TestStore::installed().await;
    let seed_before = seed_snapshot(&store).await;
    let config = ConfigRepository::new(store.db.clone());
    config.set("/custom/", "flag", Some("on")).await.unwrap();

    let report = store
        .installer()
        .install(InstallOptions { reinstall: true })
        .await
        .unwrap();

    assert_eq!(report.dropped_tables, EXPECTED_TABLES);
    // Setup history is dropped with the rest of the prefixed tables.
    assert_eq!(report.version_from, None);
    assert_eq!(config.get("/custom/", "flag").await.unwrap(), None);
    assert_eq!(seed_snapshot(&store).await, seed_before);
}

#[tokio::test]
async fn reinstall_leaves_foreign_tables_alone() {
    let store = TestStore::installed().await;
    store
        .db
        .execute(Statement::from_string(
            DbBackend::Sqlite,
            "CREATE TABLE catalog_product_entity (entity_id INTEGER PRIMARY KEY)",
        ))
        .await
        .unwrap();

    store
        .installer()
        .install(InstallOptions { reinstall: true })
        .await
        .unwrap();

    let remaining = store
        .db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT COUNT(*) AS n FROM sqlite_master WHERE name = 'catalog_product_entity'",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remaining.try_get::<i64>("", "n").unwrap(), 1);
}

#[tokio::test]
async fn failed_install_is_recorded_and_keeps_maintenance_on() {
    let store = TestStore::empty().await;
    // A leftover table with the right name but the wrong shape breaks index creation.
    store
        .db
        .execute(Statement::from_string(
            DbBackend::Sqlite,
            "CREATE TABLE m2epro_listing (id INTEGER PRIMARY KEY)",
        ))
        .await
        .unwrap();

    let err = store
        .installer()
        .install(InstallOptions::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::MigrationError(_));

    let setup = store.installer().status().await.unwrap().unwrap();
    assert!(!setup.is_completed);
    assert!(setup
        .profiler_data
        .as_deref()
        .map(|p| !p.is_empty())
        .unwrap_or(false));
    assert!(store.installer().maintenance_enabled().await.unwrap());

    // A reinstall clears the broken table and completes.
    let report = store
        .installer()
        .install(InstallOptions { reinstall: true })
        .await
        .unwrap();
    assert!(report.dropped_tables.contains(&"m2epro_listing".to_string()));
    assert!(store.installer().status().await.unwrap().unwrap().is_completed);
    assert!(!store.installer().maintenance_enabled().await.unwrap());
}

/// Records how many prefixed tables exist each time maintenance is switched on.
struct RecordingMaintenance {
    db: Arc<DatabaseConnection>,
    tables_at_enable: Mutex<Vec<usize>>,
}

#[async_trait::async_trait]
impl MaintenanceMode for RecordingMaintenance {
    async fn enable(&self) -> Result<(), AppError> {
        let tables = schema::list_prefixed_tables(self.db.as_ref()).await?;
        self.tables_at_enable.lock().unwrap().push(tables.len());
        Ok(())
    }

    async fn disable(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool, AppError> {
        Ok(!self.tables_at_enable.lock().unwrap().is_empty())
    }
}

#[tokio::test]
async fn reinstall_enables_maintenance_before_dropping_tables() {
    let store = TestStore::installed().await;
    let maintenance = Arc::new(RecordingMaintenance {
        db: store.db.clone(),
        tables_at_enable: Mutex::new(Vec::new()),
    });

    Installer::with_maintenance(store.db.clone(), maintenance.clone())
        .install(InstallOptions { reinstall: true })
        .await
        .unwrap();

    let seen = maintenance.tables_at_enable.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], EXPECTED_TABLES.len());
    assert!(seen[1] < EXPECTED_TABLES.len());
}
