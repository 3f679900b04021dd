//! Resource store tests

use serde_json::json;

use deploywatch::cache::store::{ResourceStore, StoreEvent};
use deploywatch::models::deployment::Deployment;
use deploywatch::models::status::DeploymentStatus;
use deploywatch::models::ResourceId;

use crate::common::deployment;

#[test]
fn test_merge_keeps_fields_missing_from_newer_snapshot() {
    let store = ResourceStore::new();
    let full: Deployment = serde_json::from_value(json!({
        "id": 1,
        "status": "deploying",
        "service_name": "churn-model",
        "traffic_percent": 100,
    }))
    .unwrap();
    store.merge(full);

    let merged = store.merge(deployment(1, "deployed"));

    assert_eq!(merged.status, DeploymentStatus::Deployed);
    assert_eq!(merged.service_name.as_deref(), Some("churn-model"));
    assert_eq!(merged.traffic_percent, Some(100));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_unknown_status_is_kept_verbatim() {
    let store = ResourceStore::new();
    let merged = store.merge(deployment(2, "draining"));

    assert!(merged.status.is_unknown());
    assert_eq!(merged.status.as_str(), "draining");
}

#[test]
fn test_merge_list_appends_and_never_deletes() {
    let store = ResourceStore::new();
    store.merge(deployment(1, "deployed"));
    store.merge_list(vec![deployment(2, "deploying"), deployment(3, "failed")]);

    let ids: Vec<String> = store.list().iter().map(|d| d.id.to_string()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn test_selection_follows_merges_and_removal() {
    let store = ResourceStore::new();
    store.merge(deployment(1, "deploying"));
    store.select(Some(ResourceId::from(1)));
    assert_eq!(store.selected().unwrap().status, DeploymentStatus::Deploying);

    store.merge(deployment(1, "deployed"));
    assert_eq!(store.selected().unwrap().status, DeploymentStatus::Deployed);

    assert!(store.remove(&ResourceId::from(1)).is_some());
    assert!(store.selected().is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_subscribers_see_merged_values() {
    let store = ResourceStore::new();
    let mut events = store.subscribe();

    store.merge(
        serde_json::from_value::<Deployment>(json!({
            "id": 4, "status": "updating", "service_url": "https://svc.example.com"
        }))
        .unwrap(),
    );
    store.merge(deployment(4, "deployed"));
    store.remove(&ResourceId::from(4));

    match events.recv().await.unwrap() {
        StoreEvent::Updated(d) => assert_eq!(d.status, DeploymentStatus::Updating),
        other => panic!("unexpected event {:?}", other),
    }
    match events.recv().await.unwrap() {
        StoreEvent::Updated(d) => {
            assert_eq!(d.status, DeploymentStatus::Deployed);
            assert_eq!(d.service_url.as_deref(), Some("https://svc.example.com"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(events.recv().await.unwrap(), StoreEvent::Removed(id) if id.as_str() == "4"));
}
