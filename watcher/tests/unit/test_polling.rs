//! Polling coordinator tests

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use deploywatch::cache::store::ResourceStore;
use deploywatch::models::build::Build;
use deploywatch::models::deployment::Deployment;
use deploywatch::models::status::{BuildStatus, DeploymentStatus};
use deploywatch::models::ResourceId;
use deploywatch::sync::polling::{PollingCoordinator, StartOutcome};
use deploywatch::workers::poller;

use crate::common::{build, deployment, shared, FakeSource};

fn options() -> poller::Options {
    poller::Options {
        interval: Duration::from_secs(10),
        ..Default::default()
    }
}

fn coordinator<R: deploywatch::models::Resource>(
    source: Arc<dyn deploywatch::sync::source::StatusSource<R>>,
) -> PollingCoordinator<R> {
    PollingCoordinator::new(source, Arc::new(ResourceStore::new()), options())
}

#[tokio::test(start_paused = true)]
async fn test_start_polling_is_idempotent() {
    let (source, dynamic) = shared(FakeSource::always(build(7, "building")));
    let polling = coordinator(dynamic);
    let id = ResourceId::from(7);

    assert_eq!(polling.start_polling(id.clone()), StartOutcome::Started);
    assert_eq!(polling.start_polling(id.clone()), StartOutcome::AlreadyActive);
    assert_eq!(polling.active_ids(), vec![id.clone()]);

    tokio::time::sleep(Duration::from_secs(35)).await;

    assert_eq!(source.calls(), 3);
    polling.stop_polling(&id);
}

#[tokio::test(start_paused = true)]
async fn test_polling_stops_at_terminal_status() {
    let (source, dynamic) = shared(FakeSource::new(vec![
        Some(build(1, "queued")),
        Some(build(1, "building")),
        Some(build(1, "success")),
    ]));
    let polling = coordinator(dynamic);
    let id = ResourceId::from(1);

    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_secs(95)).await;

    assert_eq!(source.calls(), 3);
    assert!(!polling.is_polling(&id));
    assert!(polling.has_finished(&id));
    assert_eq!(polling.store().get(&id).unwrap().status, BuildStatus::Success);

    // no automatic restart once finished
    assert_eq!(polling.start_polling(id.clone()), StartOutcome::Rejected);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retrack_after_finish() {
    let (source, dynamic) = shared(FakeSource::always(build(1, "failed")));
    let polling = coordinator(dynamic);
    let id = ResourceId::from(1);

    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(polling.has_finished(&id));

    assert_eq!(polling.retrack(id.clone()), StartOutcome::Started);
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_errors_skip_the_tick() {
    let (source, dynamic) = shared(FakeSource::new(vec![
        None,
        None,
        Some(deployment(3, "deploying")),
    ]));
    let polling = coordinator(dynamic);
    let id = ResourceId::from(3);

    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_secs(25)).await;

    assert_eq!(source.calls(), 2);
    assert!(polling.is_polling(&id));
    assert!(polling.store().get(&id).is_none());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        polling.store().get(&id).unwrap().status,
        DeploymentStatus::Deploying
    );
    polling.stop_all_polling();
}

#[tokio::test(start_paused = true)]
async fn test_rejected_fetch_keeps_polling() {
    let (source, dynamic) = shared(
        FakeSource::new(vec![None, Some(build(5, "success"))]).failing_with(403),
    );
    let polling = coordinator(dynamic);
    let id = ResourceId::from(5);

    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(source.calls(), 1);
    assert!(polling.is_polling(&id));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(polling.store().get(&id).unwrap().status, BuildStatus::Success);
    assert!(polling.has_finished(&id));
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_times_out() {
    let gate = Arc::new(Notify::new());
    let (source, dynamic) =
        shared(FakeSource::always(deployment(4, "updating")).gated(gate.clone()));
    let polling = PollingCoordinator::new(
        dynamic,
        Arc::new(ResourceStore::new()),
        poller::Options {
            interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        },
    );
    let id = ResourceId::from(4);

    polling.start_polling(id.clone());

    // first fetch hangs and is abandoned at t=15, second runs at t=25
    tokio::time::sleep(Duration::from_secs(26)).await;

    assert_eq!(source.calls(), 2);
    assert_eq!(
        polling.store().get(&id).unwrap().status,
        DeploymentStatus::Updating
    );
    polling.stop_all_polling();
}

#[tokio::test(start_paused = true)]
async fn test_late_response_after_stop_is_discarded() {
    let gate = Arc::new(Notify::new());
    let (source, dynamic) =
        shared(FakeSource::always(deployment(9, "deploying")).gated(gate.clone()));
    let polling = coordinator::<Deployment>(dynamic);
    let id = ResourceId::from(9);

    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(source.calls(), 1);

    assert!(polling.stop_polling(&id));
    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(polling.store().get(&id).is_none());
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_response_does_not_overwrite_newer_session() {
    let gate = Arc::new(Notify::new());
    let (source, dynamic) = shared(
        FakeSource::new(vec![
            Some(deployment(9, "deploying")),
            Some(deployment(9, "deployed")),
        ])
        .gated(gate.clone()),
    );
    let polling = coordinator::<Deployment>(dynamic);
    let id = ResourceId::from(9);

    // first session's fetch hangs in flight
    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_millis(10_500)).await;

    // restart; the new session sees the terminal status
    polling.stop_polling(&id);
    assert_eq!(polling.start_polling(id.clone()), StartOutcome::Started);
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(
        polling.store().get(&id).unwrap().status,
        DeploymentStatus::Deployed
    );

    // the stale "deploying" reply finally lands and is ignored
    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(source.calls(), 2);
    assert_eq!(
        polling.store().get(&id).unwrap().status,
        DeploymentStatus::Deployed
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_all_polling() {
    let (source, dynamic) = shared(FakeSource::<Build>::new(vec![
        Some(build(1, "building")),
    ]));
    let polling = coordinator(dynamic);

    for id in 1..=3 {
        polling.start_polling(ResourceId::from(id));
    }
    assert_eq!(polling.active_ids().len(), 3);

    assert_eq!(polling.stop_all_polling(), 3);
    assert!(polling.active_ids().is_empty());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 0);
    assert!(!polling.stop_polling(&ResourceId::from(1)));
}

#[tokio::test(start_paused = true)]
async fn test_custom_interval() {
    let (source, dynamic) = shared(FakeSource::always(build(5, "building")));
    let polling = coordinator(dynamic);
    let id = ResourceId::from(5);

    polling.start_polling_every(id.clone(), Duration::from_secs(2));
    tokio::time::sleep(Duration::from_millis(9_500)).await;

    assert_eq!(source.calls(), 4);
    polling.stop_polling(&id);
}

#[tokio::test(start_paused = true)]
async fn test_deployment_stops_after_deployed() {
    let (source, dynamic) = shared(FakeSource::new(vec![
        Some(deployment(2, "deploying")),
        Some(deployment(2, "deploying")),
        Some(deployment(2, "deployed")),
    ]));
    let polling = coordinator::<Deployment>(dynamic);
    let id = ResourceId::from(2);

    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(source.calls(), 3);
    assert!(!polling.is_polling(&id));
}
