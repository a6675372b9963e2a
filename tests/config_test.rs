//! Config store, typed settings, logs, wizards and the maintenance sweep.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration as ChronoDuration, Utc};
use common::TestStore;
use m2e_store::{
    entities::{processing_lock, wizard::WizardStatus, Component, Initiator, LogType},
    maintenance,
    repositories::{
        ConfigRepository, ListingLogFilter, LogKind, LogRepository, NewListingLog, NewOrderLog,
        NewProcessing, NewSystemLog, ProcessingLockRepository, ProcessingRepository,
        RequestPendingPartialRepository, RequestPendingSingleRepository, WizardRepository,
    },
    ServiceError, StoreSettings,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use std::collections::HashSet;

fn listing_log(listing_id: i32, action_id: Option<i32>, description: &str) -> NewListingLog {
    NewListingLog {
        account_id: None,
        marketplace_id: None,
        listing_id: Some(listing_id),
        listing_title: Some("Summer sale".to_string()),
        product_id: Some(1),
        product_title: None,
        listing_product_id: None,
        parent_listing_product_id: None,
        component: Component::Ebay,
        action_id,
        action: "revise".to_string(),
        initiator: Initiator::Extension,
        log_type: LogType::Success,
        description: description.to_string(),
        additional_data: None,
    }
}

fn system_log(description: &str) -> NewSystemLog {
    NewSystemLog {
        class: "Cron\\Runner".to_string(),
        log_type: LogType::Error,
        description: description.to_string(),
        detailed_description: None,
        additional_data: Some(json!({"trace": []})),
    }
}

#[tokio::test]
async fn values_round_trip_on_a_fresh_schema() {
    let store = TestStore::migrated().await;
    let config = ConfigRepository::new(store.db.clone());

    config.insert("/component/ebay/", "mode", Some("1")).await.unwrap();
    assert_eq!(
        config.get("/component/ebay/", "mode").await.unwrap().as_deref(),
        Some("1")
    );
    assert_eq!(config.get("/component/ebay/", "other").await.unwrap(), None);
    assert_matches!(
        config.insert("component/ebay", "MODE", Some("0")).await,
        Err(ServiceError::Conflict(_))
    );
}

#[tokio::test]
async fn paths_and_keys_are_normalised() {
    let store = TestStore::migrated().await;
    let config = ConfigRepository::new(store.db.clone());

    config.set("Cron/Service", " Auth_Key ", Some("abc")).await.unwrap();
    assert_eq!(
        config.get("/cron/service/", "auth_key").await.unwrap().as_deref(),
        Some("abc")
    );
    config.set("/cron/service/", "auth_key", None).await.unwrap();
    assert_eq!(config.get("/cron/service/", "auth_key").await.unwrap(), None);
    assert_eq!(
        config.get_group("//CRON//service").await.unwrap(),
        vec![("auth_key".to_string(), None)]
    );

    assert!(config.delete("/cron/service/", "auth_key").await.unwrap());
    assert!(!config.delete("/cron/service/", "auth_key").await.unwrap());
    assert_matches!(
        config.get("/cron/", "  ").await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn concurrent_increments_hand_out_distinct_values() {
    let store = TestStore::migrated().await;
    let config = ConfigRepository::new(store.db.clone());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let config = config.clone();
            tokio::spawn(async move { config.increment("/counters/", "next").await.unwrap() })
        })
        .collect();

    let mut values = HashSet::new();
    for handle in handles {
        assert!(values.insert(handle.await.unwrap()));
    }
    assert_eq!(values, (1..=8).collect::<HashSet<i64>>());
    assert_eq!(
        config.get("/counters/", "next").await.unwrap().as_deref(),
        Some("8")
    );
}

#[tokio::test]
async fn settings_read_seeded_defaults_and_overrides() {
    let store = TestStore::installed().await;
    let config = ConfigRepository::new(store.db.clone());

    let defaults = StoreSettings::load(&config).await.unwrap();
    assert!(defaults.component_enabled(Component::Amazon));
    assert_eq!(defaults.logs_clearing.orders.days, 90);
    assert!(!defaults.listing.inspector_enabled);

    config.set("/component/amazon/", "mode", Some("0")).await.unwrap();
    config.set("/logs/clearing/system/", "mode", Some("0")).await.unwrap();
    let changed = StoreSettings::load(&config).await.unwrap();
    assert!(!changed.component_enabled(Component::Amazon));
    assert_eq!(changed.logs_clearing.system.max_age(), None);

    config.set("/listing/product/inspector/", "max_allowed_instructions_count", Some("many")).await.unwrap();
    assert_matches!(
        StoreSettings::load(&config).await,
        Err(ServiceError::ConfigError(_))
    );
}

#[tokio::test]
async fn listing_logs_share_an_allocated_action_id() {
    let store = TestStore::installed().await;
    let logs = LogRepository::new(store.db.clone());

    let action_id = logs.next_action_id().await.unwrap();
    logs.add_listing_log(listing_log(7, Some(action_id), "Price revised")).await.unwrap();
    logs.add_listing_log(listing_log(7, Some(action_id), "Qty revised")).await.unwrap();
    let separate = logs.add_listing_log(listing_log(7, None, "Stopped")).await.unwrap();

    assert_eq!(action_id, 1);
    assert_eq!(separate.action_id, Some(2));

    let grouped = logs
        .listing_logs(ListingLogFilter {
            action_id: Some(action_id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(grouped.len(), 2);

    let limited = logs
        .listing_logs(ListingLogFilter {
            listing_id: Some(7),
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn logs_are_pruned_by_retention() {
    let store = TestStore::installed().await;
    let logs = LogRepository::new(store.db.clone());
    let settings = StoreSettings::load(&ConfigRepository::new(store.db.clone()))
        .await
        .unwrap();

    logs.add_listing_log(listing_log(1, None, "Listed")).await.unwrap();
    logs.add_system_log(system_log("timeout")).await.unwrap();
    logs.add_order_log(NewOrderLog {
        account_id: None,
        marketplace_id: None,
        order_id: Some(3),
        component: Component::Ebay,
        initiator: Initiator::Extension,
        log_type: LogType::Notice,
        description: "Order imported".to_string(),
        additional_data: None,
    })
    .await
    .unwrap();

    let soon = logs.prune_by_settings(&settings, Utc::now()).await.unwrap();
    assert_eq!(soon.total(), 0);

    let report = logs
        .prune_by_settings(&settings, Utc::now() + ChronoDuration::days(40))
        .await
        .unwrap();
    assert_eq!(report.listings, 1);
    assert_eq!(report.system, 1);
    assert_eq!(report.orders, 0);
    assert_eq!(logs.order_logs(3).await.unwrap().len(), 1);

    assert_eq!(
        logs.prune(LogKind::Orders, Utc::now() + ChronoDuration::days(1))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn wizard_progress_is_tracked() {
    let store = TestStore::installed().await;
    let wizards = WizardRepository::new(store.db.clone());

    let all = wizards.list().await.unwrap();
    assert_eq!(all[0].nick, "installationEbay");

    let active = wizards.set_status("installationEbay", WizardStatus::Active).await.unwrap();
    assert_eq!(active.status, WizardStatus::Active);
    let stepped = wizards.set_step("installationEbay", Some("account")).await.unwrap();
    assert_eq!(stepped.step.as_deref(), Some("account"));
    assert_matches!(
        wizards.set_status("unknownWizard", WizardStatus::Skipped).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn sweep_clears_expired_state() {
    let store = TestStore::installed().await;
    let now = Utc::now();
    let processings = ProcessingRepository::new(store.db.clone());
    let locks = ProcessingLockRepository::new(store.db.clone());

    let expired = processings
        .create(NewProcessing {
            model: "expired".to_string(),
            params: json!({}),
            expiration_date: Some(now - ChronoDuration::hours(1)),
        })
        .await
        .unwrap();
    processing_lock::ActiveModel {
        processing_id: Set(expired.id),
        model_name: Set("listing".to_string()),
        object_id: Set(1),
        tag: Set(None),
        update_date: Set(now),
        create_date: Set(now),
        ..Default::default()
    }
    .insert(store.db.as_ref())
    .await
    .unwrap();

    let finished = processings
        .create(NewProcessing {
            model: "finished".to_string(),
            params: json!({}),
            expiration_date: Some(now + ChronoDuration::days(100)),
        })
        .await
        .unwrap();
    locks.acquire(finished.id, "listing", 2, None).await.unwrap();
    processings.complete(finished.id, None, None, now).await.unwrap();

    RequestPendingSingleRepository::new(store.db.clone())
        .create(Component::Ebay, "single", Some(now - ChronoDuration::hours(1)))
        .await
        .unwrap();
    RequestPendingPartialRepository::new(store.db.clone())
        .create(Component::Ebay, "partial", Some(now - ChronoDuration::hours(1)))
        .await
        .unwrap();
    LogRepository::new(store.db.clone())
        .add_system_log(system_log("old failure"))
        .await
        .unwrap();

    let settings = StoreSettings::load(&ConfigRepository::new(store.db.clone()))
        .await
        .unwrap();
    let report = maintenance::sweep(store.db.clone(), &settings, now + ChronoDuration::days(40))
        .await
        .unwrap();

    assert_eq!(report.expired_processings, 1);
    assert_eq!(report.released_locks, 2);
    assert_eq!(report.expired_single_requests, 1);
    assert_eq!(report.expired_partial_requests, 1);
    assert_eq!(report.pruned_logs.system, 1);
    assert_eq!(report.total(), 6);
    assert!(processings.find_by_id(expired.id).await.unwrap().is_none());
    assert!(processings.find_by_id(finished.id).await.unwrap().is_some());
}
