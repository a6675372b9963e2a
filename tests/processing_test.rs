//! Processings, the locks they hold, heartbeat locks and transactional locks.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration as ChronoDuration, Utc};
use common::TestStore;
use m2e_store::{
    entities::{lock_item, processing_lock},
    repositories::{
        LockAcquisition, LockItemRepository, LockTransactionalRepository, NewProcessing,
        ProcessingLockRepository, ProcessingRepository, ProcessingState,
    },
    ServiceError,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use std::time::Duration;

fn processing(model: &str) -> NewProcessing {
    NewProcessing {
        model: model.to_string(),
        params: json!({"account_id": 1}),
        expiration_date: None,
    }
}

#[tokio::test]
async fn exactly_one_processing_wins_a_contended_object() {
    let store = TestStore::installed().await;
    let processings = ProcessingRepository::new(store.db.clone());
    let locks = ProcessingLockRepository::new(store.db.clone());

    let mut ids = Vec::new();
    for n in 0..6 {
        ids.push(processings.create(processing(&format!("Ebay_Connector_{}", n))).await.unwrap().id);
    }

    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire(id, "listing_product", 77, None).await.unwrap() })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        if let LockAcquisition::Acquired(lock) = handle.await.unwrap() {
            winners.push(lock.processing_id);
        }
    }
    assert_eq!(winners.len(), 1);
    assert!(locks.is_locked("listing_product", 77, Utc::now()).await.unwrap());

    // Re-entrant for the owner.
    let again = locks.acquire(winners[0], "listing_product", 77, None).await.unwrap();
    assert!(again.is_acquired());
}

#[tokio::test]
async fn completed_owner_no_longer_blocks_the_object() {
    let store = TestStore::installed().await;
    let processings = ProcessingRepository::new(store.db.clone());
    let locks = ProcessingLockRepository::new(store.db.clone());

    let first = processings.create(processing("first")).await.unwrap();
    let second = processings.create(processing("second")).await.unwrap();

    assert!(locks.acquire(first.id, "order", 5, Some("sync".into())).await.unwrap().is_acquired());
    assert_eq!(
        locks.acquire(second.id, "order", 5, None).await.unwrap(),
        LockAcquisition::Held { processing_id: first.id }
    );

    processings
        .complete(first.id, Some(json!({"ok": true})), None, Utc::now())
        .await
        .unwrap();

    let taken = locks.acquire(second.id, "order", 5, None).await.unwrap();
    assert_matches!(taken, LockAcquisition::Acquired(ref lock) if lock.processing_id == second.id);
    assert_matches!(
        locks.acquire(first.id, "order", 6, None).await,
        Err(ServiceError::InvalidStatus(_))
    );
}

#[tokio::test]
async fn expired_owner_lock_is_cleared_on_acquire() {
    let store = TestStore::installed().await;
    let processings = ProcessingRepository::new(store.db.clone());
    let locks = ProcessingLockRepository::new(store.db.clone());
    let now = Utc::now();

    let expired = processings
        .create(NewProcessing {
            expiration_date: Some(now - ChronoDuration::hours(2)),
            ..processing("expired")
        })
        .await
        .unwrap();
    processing_lock::ActiveModel {
        processing_id: Set(expired.id),
        model_name: Set("listing".to_string()),
        object_id: Set(9),
        tag: Set(None),
        update_date: Set(now - ChronoDuration::hours(3)),
        create_date: Set(now - ChronoDuration::hours(3)),
        ..Default::default()
    }
    .insert(store.db.as_ref())
    .await
    .unwrap();

    assert!(!locks.is_locked("listing", 9, now).await.unwrap());
    assert_eq!(
        processings.state(expired.id, now).await.unwrap(),
        ProcessingState::Expired
    );

    let fresh = processings.create(processing("fresh")).await.unwrap();
    assert!(locks.acquire(fresh.id, "listing", 9, None).await.unwrap().is_acquired());
    assert_eq!(locks.locks_for(expired.id).await.unwrap().len(), 0);
}

#[tokio::test]
async fn expired_processing_cannot_complete() {
    let store = TestStore::installed().await;
    let processings = ProcessingRepository::new(store.db.clone());
    let now = Utc::now();

    let late = processings
        .create(NewProcessing {
            expiration_date: Some(now - ChronoDuration::hours(1)),
            ..processing("late")
        })
        .await
        .unwrap();
    assert_matches!(
        processings.complete(late.id, None, None, now).await,
        Err(ServiceError::Expired(_))
    );
    assert_eq!(processings.list_expired(now).await.unwrap().len(), 1);

    let ok = processings.create(processing("ok")).await.unwrap();
    let done = processings.complete(ok.id, None, Some(json!(["done"])), now).await.unwrap();
    assert!(done.is_completed);
    assert_matches!(
        processings.complete(ok.id, None, None, now).await,
        Err(ServiceError::InvalidStatus(_))
    );
    assert!(processings.list_active(now).await.unwrap().is_empty());
}

#[tokio::test]
async fn default_lifetime_applies_when_no_expiration_given() {
    let store = TestStore::installed().await;
    let processings =
        ProcessingRepository::new(store.db.clone()).with_default_ttl(Duration::from_secs(3600));
    let before = Utc::now();

    let created = processings.create(processing("ttl")).await.unwrap();
    assert!(created.expiration_date > before + ChronoDuration::minutes(59));
    assert!(created.expiration_date < before + ChronoDuration::minutes(61));
}

#[tokio::test]
async fn removing_a_processing_releases_its_locks() {
    let store = TestStore::installed().await;
    let processings = ProcessingRepository::new(store.db.clone());
    let locks = ProcessingLockRepository::new(store.db.clone());

    let p = processings.create(processing("owner")).await.unwrap();
    locks.acquire(p.id, "listing_product", 1, None).await.unwrap();
    locks.acquire(p.id, "listing_product", 2, None).await.unwrap();
    assert_eq!(locks.locks_for(p.id).await.unwrap().len(), 2);

    assert!(processings.remove(p.id).await.unwrap());
    assert!(locks.locks_for(p.id).await.unwrap().is_empty());
    assert!(!processings.remove(p.id).await.unwrap());
}

#[tokio::test]
async fn inactive_lock_item_can_be_taken_over() {
    let store = TestStore::installed().await;
    let items = LockItemRepository::new(store.db.clone());
    let max_inactive = Duration::from_secs(10 * 60);
    let t0 = Utc::now() - ChronoDuration::hours(5);

    assert!(items.acquire("synchronization", None, max_inactive, t0).await.unwrap());
    assert!(!items
        .acquire("synchronization", None, max_inactive, t0 + ChronoDuration::minutes(1))
        .await
        .unwrap());

    let t1 = t0 + ChronoDuration::hours(1);
    assert!(!items.is_locked("synchronization", max_inactive, t1).await.unwrap());
    assert!(items.heartbeat("synchronization", t1).await.unwrap());
    assert!(items.is_locked("synchronization", max_inactive, t1).await.unwrap());
    assert!(!items
        .acquire("synchronization", None, max_inactive, t1 + ChronoDuration::minutes(1))
        .await
        .unwrap());

    let t2 = t1 + ChronoDuration::hours(1);
    assert!(items.acquire("synchronization", None, max_inactive, t2).await.unwrap());
    let stamped = items.find("synchronization").await.unwrap().unwrap().update_date;
    assert!((stamped - t2).num_seconds().abs() < 1);
}

#[tokio::test]
async fn releasing_a_lock_item_releases_its_children() {
    let store = TestStore::installed().await;
    let items = LockItemRepository::new(store.db.clone());
    let max_inactive = Duration::from_secs(600);
    let now = Utc::now();

    items.acquire("cron", None, max_inactive, now).await.unwrap();
    let parent = items.find("cron").await.unwrap().unwrap();
    items.acquire("cron_task_orders", Some(parent.id), max_inactive, now).await.unwrap();
    assert!(items.set_data("cron_task_orders", Some(json!({"step": 2}))).await.unwrap());

    assert!(items.release("cron").await.unwrap());
    assert_eq!(items.find("cron_task_orders").await.unwrap(), None);
    assert!(!items.release("cron").await.unwrap());
}

#[tokio::test]
async fn transactional_lock_commits_on_success_and_rolls_back_on_error() {
    let store = TestStore::installed().await;
    let tx_locks = LockTransactionalRepository::new(store.db.clone());
    let items = LockItemRepository::new(store.db.clone());

    let id = tx_locks
        .with_lock("synchronization_general", |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let row = lock_item::ActiveModel {
                    nick: Set("committed".to_string()),
                    parent_id: Set(None),
                    data: Set(None),
                    update_date: Set(now),
                    create_date: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(row.id)
            })
        })
        .await
        .unwrap();
    assert_eq!(items.find("committed").await.unwrap().map(|r| r.id), Some(id));

    let err = tx_locks
        .with_lock("synchronization_general", |txn| {
            Box::pin(async move {
                let now = Utc::now();
                lock_item::ActiveModel {
                    nick: Set("rolled_back".to_string()),
                    parent_id: Set(None),
                    data: Set(None),
                    update_date: Set(now),
                    create_date: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Err::<(), _>(ServiceError::Conflict("abort".to_string()))
            })
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
    assert_eq!(items.find("rolled_back").await.unwrap(), None);
    assert_eq!(
        lock_item::Entity::find().all(store.db.as_ref()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn store_applies_configured_lifetimes() {
    let store = TestStore::installed().await;
    let mut config = m2e_store::config::AppConfig::new("sqlite::memory:".into(), "test".into());
    config.processing_default_ttl_secs = 120;
    config.request_pending_ttl_secs = 7200;
    let handle = m2e_store::Store::from_config(store.db.clone(), &config);
    let before = Utc::now();

    let p = handle.processings().create(processing("short")).await.unwrap();
    assert!(p.expiration_date <= before + ChronoDuration::seconds(125));

    let r = handle
        .single_requests()
        .create(m2e_store::entities::Component::Ebay, "ttl-hash", None)
        .await
        .unwrap();
    assert!(r.expiration_date > before + ChronoDuration::minutes(110));
    assert!(r.expiration_date < before + ChronoDuration::minutes(130));
}
