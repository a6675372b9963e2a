//! Install and upgrade entry point.
//!
//! A run is recorded in `m2epro_setup`. Failure leaves the record not
//! completed with the error chain in `profiler_data`, keeps maintenance mode
//! on, and does not undo tables that were already created.

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use sea_orm_migration::{MigratorTrait, SchemaManager};
use serde::Serialize;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::entities::setup::{self, Entity as Setup};
use crate::errors::{AppError, ServiceError};
use crate::migrator::{self, Migrator};
use crate::repositories::ConfigRepository;
use crate::schema;
use crate::seed::{self, SeedReport};

/// Version written to `version_to` of every setup record.
pub const SCHEMA_VERSION: &str = env!("CARGO_PKG_VERSION");

const MAINTENANCE_PATH: &str = "/maintenance/";
const MAINTENANCE_KEY: &str = "mode";

/// Switch that keeps the store out of use while it is being built.
#[async_trait]
pub trait MaintenanceMode: Send + Sync {
    async fn enable(&self) -> Result<(), AppError>;
    async fn disable(&self) -> Result<(), AppError>;
    async fn is_enabled(&self) -> Result<bool, AppError>;
}

/// Maintenance flag stored at `/maintenance/ mode`.
#[derive(Debug, Clone)]
pub struct ConfigMaintenanceMode {
    config: ConfigRepository,
}

impl ConfigMaintenanceMode {
    pub fn new(config: ConfigRepository) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MaintenanceMode for ConfigMaintenanceMode {
    async fn enable(&self) -> Result<(), AppError> {
        self.config
            .set(MAINTENANCE_PATH, MAINTENANCE_KEY, Some("1"))
            .await
    }

    async fn disable(&self) -> Result<(), AppError> {
        self.config
            .set(MAINTENANCE_PATH, MAINTENANCE_KEY, Some("0"))
            .await
    }

    async fn is_enabled(&self) -> Result<bool, AppError> {
        Ok(self
            .config
            .get(MAINTENANCE_PATH, MAINTENANCE_KEY)
            .await?
            .as_deref()
            == Some("1"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Drop every prefixed table before installing.
    pub reinstall: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub setup_id: i32,
    pub version_from: Option<String>,
    pub version_to: String,
    pub dropped_tables: Vec<String>,
    pub applied_migrations: usize,
    pub seed: SeedReport,
    pub elapsed_ms: u128,
}

pub struct Installer {
    db: Arc<DatabaseConnection>,
    maintenance: Arc<dyn MaintenanceMode>,
}

impl Installer {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        let maintenance = Arc::new(ConfigMaintenanceMode::new(ConfigRepository::new(db.clone())));
        Self { db, maintenance }
    }

    pub fn with_maintenance(db: Arc<DatabaseConnection>, maintenance: Arc<dyn MaintenanceMode>) -> Self {
        Self { db, maintenance }
    }

    #[instrument(skip(self))]
    pub async fn install(&self, opts: InstallOptions) -> Result<InstallReport, AppError> {
        let started = Instant::now();
        let db = self.db.as_ref();

        self.bootstrap().await?;
        self.maintenance.enable().await?;

        let dropped_tables = if opts.reinstall {
            let dropped = schema::drop_prefixed_tables(db).await?;
            // The flag went away with the config table.
            self.bootstrap().await?;
            self.maintenance.enable().await?;
            dropped
        } else {
            Vec::new()
        };

        let version_from = self.last_completed_version().await?;
        let now = Utc::now();
        let record = setup::ActiveModel {
            version_from: Set(version_from.clone()),
            version_to: Set(SCHEMA_VERSION.to_string()),
            is_backuped: Set(false),
            is_completed: Set(false),
            profiler_data: Set(None),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(
            setup_id = record.id,
            version_from = ?version_from,
            version_to = SCHEMA_VERSION,
            "Install started"
        );

        match self.apply().await {
            Ok((applied_migrations, seed)) => {
                let mut done = record.into_active_model();
                done.is_completed = Set(true);
                let done = done.update(db).await?;

                self.maintenance.disable().await?;
                counter!("m2e_store.install.completed", 1);

                let report = InstallReport {
                    setup_id: done.id,
                    version_from,
                    version_to: SCHEMA_VERSION.to_string(),
                    dropped_tables,
                    applied_migrations,
                    seed,
                    elapsed_ms: started.elapsed().as_millis(),
                };
                info!(
                    setup_id = report.setup_id,
                    applied_migrations = report.applied_migrations,
                    seeded = report.seed.total(),
                    elapsed_ms = report.elapsed_ms as u64,
                    "Install completed"
                );
                Ok(report)
            }
            Err(e) => {
                let chain = error_chain(&e);
                error!(source = "installer", setup_id = record.id, error = %chain, "Install failed");
                counter!("m2e_store.install.failed", 1);

                let mut failed = record.into_active_model();
                failed.profiler_data = Set(Some(chain.clone()));
                if let Err(update_err) = failed.update(db).await {
                    warn!(error = %update_err, "Could not record install failure on setup record");
                }

                Err(ServiceError::MigrationError(chain))
            }
        }
    }

    async fn bootstrap(&self) -> Result<(), AppError> {
        migrator::bootstrap(&SchemaManager::new(self.db.as_ref()))
            .await
            .map_err(|e| {
                counter!("m2e_store.install.failed", 1);
                error!(source = "installer", error = %e, "Could not create bootstrap tables");
                ServiceError::MigrationError(e.to_string())
            })
    }

    async fn apply(&self) -> Result<(usize, SeedReport), ServiceError> {
        let db = self.db.as_ref();
        let pending = Migrator::get_pending_migrations(db).await?.len();
        Migrator::up(db, None).await?;
        let seed = seed::seed_all(db).await?;
        Ok((pending, seed))
    }

    async fn last_completed_version(&self) -> Result<Option<String>, AppError> {
        Ok(Setup::find()
            .filter(setup::Column::IsCompleted.eq(true))
            .order_by_desc(setup::Column::Id)
            .one(self.db.as_ref())
            .await?
            .map(|s| s.version_to))
    }

    /// Latest setup record; `None` before the first install.
    pub async fn status(&self) -> Result<Option<setup::Model>, AppError> {
        Setup::find()
            .order_by_desc(setup::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn maintenance_enabled(&self) -> Result<bool, AppError> {
        self.maintenance.is_enabled().await
    }
}

/// Renders an error and all of its sources, one per line.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_chain_includes_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let outer = anyhow::Error::new(inner).context("writing setup record");
        let service = ServiceError::Other(outer);
        let chain = error_chain(&service);
        assert!(chain.starts_with("Other error: writing setup record"));
        assert!(chain.contains("caused by: disk full"));
    }
}
