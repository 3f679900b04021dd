//! End-to-end pipeline tracking: polling drives the store, progress is
//! derived from the store

use std::sync::Arc;
use std::time::Duration;

use deploywatch::cache::store::{ResourceStore, StoreEvent};
use deploywatch::models::pipeline::Pipeline;
use deploywatch::models::status::PipelineStatus;
use deploywatch::models::ResourceId;
use deploywatch::progress::PipelineProgress;
use deploywatch::sync::polling::PollingCoordinator;
use deploywatch::workers::poller;

use crate::common::{pipeline, shared, FakeSource};

#[tokio::test(start_paused = true)]
async fn test_pipeline_progress_reaches_100() {
    let (source, dynamic) = shared(FakeSource::new(vec![
        Some(pipeline(42, "processing", Some("parse"), &[])),
        Some(pipeline(42, "processing", Some("dependencies"), &["parse"])),
        Some(pipeline(42, "processing", Some("upload"), &["parse", "dependencies"])),
        // partial payload without the completed list
        Some(pipeline(42, "processing", Some("upload"), &[])),
        Some(pipeline(42, "processing", Some("build"), &["parse", "dependencies", "upload"])),
        Some(pipeline(
            42,
            "processing",
            Some("deploy"),
            &["parse", "dependencies", "upload", "build"],
        )),
        Some(pipeline(
            42,
            "deployed",
            Some("deploy"),
            &["parse", "dependencies", "upload", "build", "deploy"],
        )),
    ]));
    let store: Arc<ResourceStore<Pipeline>> = Arc::new(ResourceStore::new());
    let polling = PollingCoordinator::new(
        dynamic,
        store.clone(),
        poller::Options {
            interval: Duration::from_secs(10),
            ..Default::default()
        },
    );
    let id = ResourceId::from(42);
    let mut events = store.subscribe();

    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_secs(120)).await;

    let mut seen = Vec::new();
    while let Ok(StoreEvent::Updated(p)) = events.try_recv() {
        assert!(p.steps_are_consistent(), "inconsistent steps: {:?}", p);
        seen.push(PipelineProgress::of(&p).progress_percentage());
    }

    assert_eq!(seen, vec![10, 30, 50, 50, 70, 90, 100]);
    assert_eq!(source.calls(), 7);
    assert!(!polling.is_polling(&id));

    let done = store.get(&id).unwrap();
    assert_eq!(done.status, PipelineStatus::Deployed);
    assert!(PipelineProgress::of(&done).estimated_time_remaining().is_zero());
}

#[tokio::test(start_paused = true)]
async fn test_two_tick_pipeline_scenario() {
    let mut deployed = pipeline(
        42,
        "deployed",
        Some("deploy"),
        &["parse", "dependencies", "upload", "build", "deploy"],
    );
    deployed.service_url = Some("https://x.run.app".to_string());

    let (source, dynamic) = shared(FakeSource::new(vec![
        Some(pipeline(42, "processing", Some("build"), &["parse", "dependencies", "upload"])),
        Some(deployed),
    ]));
    let polling = PollingCoordinator::new(dynamic, Arc::new(ResourceStore::new()), poller::Options::default());
    let id = ResourceId::from(42);

    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_secs(15)).await;
    let mid = polling.store().get(&id).unwrap();
    assert_eq!(PipelineProgress::of(&mid).progress_percentage(), 70);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!polling.is_polling(&id));

    let done = polling.store().get(&id).unwrap();
    assert_eq!(PipelineProgress::of(&done).progress_percentage(), 100);
    assert_eq!(done.service_url.as_deref(), Some("https://x.run.app"));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_pipeline_stops_polling() {
    let (source, dynamic) = shared(FakeSource::new(vec![
        Some(pipeline(8, "processing", Some("build"), &["parse", "dependencies", "upload"])),
        Some(pipeline(8, "failed", Some("build"), &["parse", "dependencies", "upload"])),
    ]));
    let polling = PollingCoordinator::new(dynamic, Arc::new(ResourceStore::new()), poller::Options::default());
    let id = ResourceId::from(8);

    polling.start_polling(id.clone());
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(source.calls(), 2);
    assert!(polling.has_finished(&id));

    let failed = polling.store().get(&id).unwrap();
    let progress = PipelineProgress::of(&failed);
    assert_eq!(progress.progress_percentage(), 60);
    assert!(progress.estimated_time_remaining().is_zero());
}
