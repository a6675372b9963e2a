//! Periodic clean-up of rows nothing will read again.

use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::repositories::{
    LogPruneReport, LogRepository, ProcessingLockRepository, ProcessingRepository,
    RequestPendingPartialRepository, RequestPendingSingleRepository,
};
use crate::settings::StoreSettings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired_processings: u64,
    pub released_locks: u64,
    pub expired_single_requests: u64,
    pub expired_partial_requests: u64,
    pub pruned_logs: LogPruneReport,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.expired_processings
            + self.released_locks
            + self.expired_single_requests
            + self.expired_partial_requests
            + self.pruned_logs.total()
    }
}

/// Removes expired processings with their locks, stale locks, abandoned
/// request continuations and logs past retention.
#[instrument(skip(db, settings))]
pub async fn sweep(
    db: Arc<DatabaseConnection>,
    settings: &StoreSettings,
    now: DateTime<Utc>,
) -> Result<SweepReport, AppError> {
    let processings = ProcessingRepository::new(db.clone());
    let locks = ProcessingLockRepository::new(db.clone());
    let mut report = SweepReport::default();

    for processing in processings.list_expired(now).await? {
        report.released_locks += locks.release(processing.id).await?;
        if processings.remove(processing.id).await? {
            report.expired_processings += 1;
        }
    }
    report.released_locks += locks.release_stale(now).await?;

    report.expired_single_requests = RequestPendingSingleRepository::new(db.clone())
        .remove_expired(now)
        .await?;
    report.expired_partial_requests = RequestPendingPartialRepository::new(db.clone())
        .remove_expired(now)
        .await?;

    report.pruned_logs = LogRepository::new(db)
        .prune_by_settings(settings, now)
        .await?;

    counter!("m2e_store.maintenance.swept", report.total());
    info!(
        expired_processings = report.expired_processings,
        released_locks = report.released_locks,
        expired_requests = report.expired_single_requests + report.expired_partial_requests,
        pruned_logs = report.pruned_logs.total(),
        "Maintenance sweep finished"
    );
    Ok(report)
}
