//! Continuation records for asynchronous channel requests.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestStore;
use m2e_store::{
    entities::Component,
    repositories::{RequestPendingPartialRepository, RequestPendingSingleRepository, RequestState},
    ServiceError,
};
use serde_json::json;

#[tokio::test]
async fn expired_incomplete_request_is_not_active() {
    let store = TestStore::installed().await;
    let requests = RequestPendingSingleRepository::new(store.db.clone());
    let now = Utc::now();

    let stale = requests
        .create(Component::Ebay, "hash-stale", Some(now - Duration::hours(1)))
        .await
        .unwrap();
    let live = requests.create(Component::Ebay, "hash-live", None).await.unwrap();

    let active: Vec<i32> = requests
        .list_active(now)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(active, vec![live.id]);
    assert_eq!(requests.state(stale.id, now).await.unwrap(), RequestState::Abandoned);
    assert_eq!(requests.state(live.id, now).await.unwrap(), RequestState::Pending);

    assert_matches!(
        requests.complete(stale.id, Some(json!({"items": []})), None, now).await,
        Err(ServiceError::Expired(_))
    );
}

#[tokio::test]
async fn completed_request_stays_readable_after_expiry() {
    let store = TestStore::installed().await;
    let requests = RequestPendingSingleRepository::new(store.db.clone());
    let now = Utc::now();

    let request = requests
        .create(Component::Amazon, "hash-report", Some(now + Duration::hours(1)))
        .await
        .unwrap();
    let done = requests
        .complete(request.id, Some(json!({"report": "ready"})), None, now)
        .await
        .unwrap();
    assert!(done.is_completed);
    assert_eq!(done.result_data, Some(json!({"report": "ready"})));

    let later = now + Duration::hours(3);
    assert_eq!(requests.list_active(later).await.unwrap().len(), 1);
    assert_eq!(requests.state(request.id, later).await.unwrap(), RequestState::Completed);
    assert_matches!(
        requests.complete(request.id, None, None, now).await,
        Err(ServiceError::InvalidStatus(_))
    );
    assert_eq!(requests.remove_expired(later).await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_server_hash_conflicts() {
    let store = TestStore::installed().await;
    let requests = RequestPendingSingleRepository::new(store.db.clone());

    requests.create(Component::Walmart, "dup", None).await.unwrap();
    assert_matches!(
        requests.create(Component::Walmart, "dup", None).await,
        Err(ServiceError::Conflict(_))
    );
    let found = requests.find_by_hash(Component::Walmart, "dup").await.unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn parts_are_stored_strictly_in_order() {
    let store = TestStore::installed().await;
    let requests = RequestPendingPartialRepository::new(store.db.clone());

    let request = requests.create(Component::Ebay, "paged", None).await.unwrap();
    assert_eq!(request.next_part, 1);

    requests.store_part(request.id, 1, json!({"page": 1})).await.unwrap();
    assert_matches!(
        requests.store_part(request.id, 3, json!({"page": 3})).await,
        Err(ServiceError::Conflict(_))
    );
    assert_matches!(
        requests.store_part(request.id, 1, json!({"page": "again"})).await,
        Err(ServiceError::Conflict(_))
    );
    assert_matches!(
        requests.store_part(request.id, 0, json!({})).await,
        Err(ServiceError::ValidationError(_))
    );
    requests.store_part(request.id, 2, json!({"page": 2})).await.unwrap();
    requests.store_part(request.id, 3, json!({"page": 3})).await.unwrap();
    assert_matches!(
        requests.assemble(request.id).await,
        Err(ServiceError::InvalidStatus(_))
    );

    let now = Utc::now();
    requests.complete(request.id, Some(json!([])), now).await.unwrap();
    let pages = requests.assemble(request.id).await.unwrap();
    assert_eq!(pages, vec![json!({"page": 1}), json!({"page": 2}), json!({"page": 3})]);
    assert_matches!(
        requests.store_part(request.id, 4, json!({"page": 4})).await,
        Err(ServiceError::Conflict(_))
    );
    assert_eq!(requests.state(request.id, now).await.unwrap(), RequestState::Completed);
}

#[tokio::test]
async fn abandoned_partial_request_accepts_no_pages() {
    let store = TestStore::installed().await;
    let requests = RequestPendingPartialRepository::new(store.db.clone());
    let now = Utc::now();

    let abandoned = requests
        .create(Component::Amazon, "late", Some(now - Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(requests.state(abandoned.id, now).await.unwrap(), RequestState::Abandoned);

    assert_matches!(
        requests.store_part(abandoned.id, 1, json!({"page": 1})).await,
        Err(ServiceError::Expired(_))
    );
    let unchanged = requests.find_by_hash(Component::Amazon, "late").await.unwrap().unwrap();
    assert_eq!(unchanged.next_part, 1);
    assert_matches!(
        requests.assemble(abandoned.id).await,
        Err(ServiceError::InvalidStatus(_))
    );
}

#[tokio::test]
async fn expired_partial_requests_are_swept_with_their_pages() {
    let store = TestStore::installed().await;
    let requests = RequestPendingPartialRepository::new(store.db.clone());
    let now = Utc::now();
    let sweep_at = now + Duration::hours(2);

    let expired = requests
        .create(Component::Ebay, "old", Some(now - Duration::hours(2)))
        .await
        .unwrap();
    assert_matches!(
        requests.store_part(expired.id, 1, json!({"page": 1})).await,
        Err(ServiceError::Expired(_))
    );
    let paged = requests
        .create(Component::Ebay, "short", Some(now + Duration::hours(1)))
        .await
        .unwrap();
    requests.store_part(paged.id, 1, json!({"page": 1})).await.unwrap();
    let live = requests.create(Component::Ebay, "new", None).await.unwrap();

    assert_eq!(requests.remove_expired(sweep_at).await.unwrap(), 2);
    assert_matches!(requests.assemble(expired.id).await, Err(ServiceError::NotFound(_)));
    assert_matches!(requests.assemble(paged.id).await, Err(ServiceError::NotFound(_)));
    assert_eq!(requests.list_active(sweep_at).await.unwrap().len(), 1);
    assert!(requests.remove(live.id).await.unwrap());
    assert_eq!(requests.remove_expired(sweep_at).await.unwrap(), 0);
}
