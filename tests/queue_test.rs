//! Instruction queue and scheduled actions.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestStore;
use m2e_store::{
    entities::{listing_product_scheduled_action::ScheduledActionType, Component},
    repositories::{
        InstructionRepository, NewInstruction, NewScheduledAction, ScheduledActionRepository,
    },
    ServiceError,
};
use serde_json::json;
use std::collections::HashSet;

fn instruction(listing_product_id: i32, kind: &str, priority: i32) -> NewInstruction {
    NewInstruction {
        listing_product_id,
        component: Component::Ebay,
        instruction_type: kind.to_string(),
        initiator: "test".to_string(),
        priority,
        skip_until: None,
        additional_data: None,
    }
}

fn action(listing_product_id: i32, action_type: ScheduledActionType) -> NewScheduledAction {
    NewScheduledAction {
        listing_product_id,
        component: Component::Ebay,
        action_type,
        is_force: false,
        tag: None,
        additional_data: None,
    }
}

#[tokio::test]
async fn lower_priority_value_is_consumed_first() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let lp = store.listing_product(listing.id, 10).await;
    let queue = InstructionRepository::new(store.db.clone());
    let past = Utc::now() - Duration::hours(3);

    queue
        .enqueue(vec![
            NewInstruction {
                skip_until: Some(past),
                ..instruction(lp.id, "magento_qty_changed", 5)
            },
            NewInstruction {
                skip_until: Some(past),
                ..instruction(lp.id, "channel_status_changed", 1)
            },
        ])
        .await
        .unwrap();

    let pending = queue.pending(Utc::now(), 10).await.unwrap();
    let order: Vec<i32> = pending.iter().map(|i| i.priority).collect();
    assert_eq!(order, vec![1, 5]);
    assert_eq!(pending[0].instruction_type, "channel_status_changed");
}

#[tokio::test]
async fn deferred_instructions_stay_hidden_until_due() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let lp = store.listing_product(listing.id, 11).await;
    let queue = InstructionRepository::new(store.db.clone());
    let now = Utc::now();

    queue
        .enqueue(vec![
            instruction(lp.id, "due", 10),
            NewInstruction {
                skip_until: Some(now + Duration::hours(2)),
                ..instruction(lp.id, "later", 1)
            },
        ])
        .await
        .unwrap();

    let visible = queue.pending(now, 10).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].instruction_type, "due");

    let after = queue.pending(now + Duration::hours(4), 10).await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].instruction_type, "later");

    assert!(queue.defer(visible[0].id, now + Duration::hours(1)).await.unwrap());
    assert!(queue.pending(now, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn instructions_for_unknown_products_are_rejected() {
    let store = TestStore::installed().await;
    let queue = InstructionRepository::new(store.db.clone());

    let err = queue
        .enqueue(vec![instruction(4242, "orphan", 1)])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
    assert_eq!(queue.enqueue(Vec::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_consumers_never_share_an_instruction() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let lp = store.listing_product(listing.id, 12).await;
    let queue = InstructionRepository::new(store.db.clone());

    let batch: Vec<NewInstruction> = (0..20)
        .map(|n| instruction(lp.id, &format!("kind_{}", n), n % 4))
        .collect();
    assert_eq!(queue.enqueue(batch).await.unwrap(), 20);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            queue.claim_batch(Utc::now(), 20).await.unwrap()
        }));
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for claimed in handle.await.unwrap() {
            total += 1;
            assert!(seen.insert(claimed.id), "instruction {} claimed twice", claimed.id);
        }
    }
    assert_eq!(total, 20);
    assert_eq!(queue.count_for_product(lp.id).await.unwrap(), 0);
}

#[tokio::test]
async fn upsert_keeps_one_action_per_product() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let lp = store.listing_product(listing.id, 13).await;
    let actions = ScheduledActionRepository::new(store.db.clone());

    let first = actions
        .upsert(action(lp.id, ScheduledActionType::List))
        .await
        .unwrap();
    let second = actions
        .upsert(NewScheduledAction {
            is_force: true,
            tag: Some("qty".to_string()),
            additional_data: Some(json!({"configurator": {"qty": true}})),
            ..action(lp.id, ScheduledActionType::Revise)
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.action_type, ScheduledActionType::Revise);
    assert!(second.is_force);
    assert!(actions
        .list_by_action(ScheduledActionType::List, 10)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        actions
            .list_by_action(ScheduledActionType::Revise, 10)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn plain_insert_of_a_second_action_conflicts() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let lp = store.listing_product(listing.id, 14).await;
    let actions = ScheduledActionRepository::new(store.db.clone());

    actions
        .insert(action(lp.id, ScheduledActionType::Stop))
        .await
        .unwrap();
    let err = actions
        .insert(action(lp.id, ScheduledActionType::Relist))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let kept = actions.find_for_product(lp.id).await.unwrap().unwrap();
    assert_eq!(kept.action_type, ScheduledActionType::Stop);

    assert!(actions.remove_for_product(lp.id).await.unwrap());
    assert!(!actions.remove_for_product(lp.id).await.unwrap());
    assert_matches!(
        actions.upsert(action(9999, ScheduledActionType::List)).await,
        Err(ServiceError::NotFound(_))
    );
}
