//! Stream coordinator tests

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;

use deploywatch::models::log::{LogEntry, Severity};
use deploywatch::models::{ResourceId, ResourceKind};
use deploywatch::stream::connector::Frame;
use deploywatch::stream::coordinator::{
    CloseReason, ConnectionState, ReconnectPolicy, StreamCoordinator, StreamOptions,
    WAITING_STATUS,
};

use crate::common::{log_frame, text_frame, FakeConnector, Script};

fn stream(connector: &Arc<FakeConnector>, options: StreamOptions) -> StreamCoordinator {
    StreamCoordinator::new(
        ResourceKind::Deployment,
        ResourceId::from(12),
        connector.clone(),
        options,
    )
}

fn settle() -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(100))
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_abnormal_close() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![
        log_frame("info", "pulling image"),
        Frame::Closed { code: Some(1006) },
    ])]));
    let stream = stream(&connector, StreamOptions::default());

    assert!(stream.start_stream());
    settle().await;
    assert_eq!(connector.connects(), 1);
    assert_eq!(stream.state(), ConnectionState::PendingRetry);
    assert_eq!(stream.logs().len(), 1);

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(connector.connects(), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(connector.connects(), 2);
    assert_eq!(stream.state(), ConnectionState::Connected);
    assert_eq!(stream.reconnect_count(), 1);

    stream.stop_stream();
}

#[tokio::test(start_paused = true)]
async fn test_no_reconnect_after_complete() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![
        log_frame("info", "service ready"),
        text_frame(json!({ "type": "complete", "buildStatus": "success" })),
    ])]));
    let stream = stream(&connector, StreamOptions::default());

    stream.start_stream();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.closes(), 1);
    assert_eq!(stream.state(), ConnectionState::Disconnected);
    assert_eq!(stream.status_text().as_deref(), Some("Completed: success"));
}

#[tokio::test(start_paused = true)]
async fn test_no_reconnect_after_normal_close() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![Frame::Closed {
        code: Some(1000),
    }])]));
    let stream = stream(&connector, StreamOptions::default());

    stream.start_stream();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(connector.connects(), 1);
    assert_eq!(stream.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_not_ready_sets_waiting_status_without_retry() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![text_frame(
        json!({ "type": "error", "message": "Build job not found" }),
    )])]));
    let stream = stream(&connector, StreamOptions::default());

    stream.start_stream();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(stream.status_text().as_deref(), Some(WAITING_STATUS));
    assert_eq!(stream.state(), ConnectionState::Disconnected);
    assert_eq!(connector.connects(), 1);

    assert!(stream.resume_if_waiting());
    settle().await;
    assert_eq!(connector.connects(), 2);
    assert_eq!(stream.state(), ConnectionState::Connected);
    stream.stop_stream();
}

#[tokio::test(start_paused = true)]
async fn test_resume_after_not_ready_reaches_live_logs() {
    let connector = Arc::new(FakeConnector::new(vec![
        Script::Frames(vec![text_frame(
            json!({ "type": "error", "message": "Pipeline not ready" }),
        )]),
        Script::Frames(vec![log_frame("info", "building")]),
    ]));
    let stream = stream(&connector, StreamOptions::default());
    let mut notices = stream.subscribe_notices();

    stream.start_stream();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(connector.connects(), 1);
    assert_eq!(stream.last_close(), Some(CloseReason::NotReady));
    assert!(notices.has_changed().unwrap());
    notices.borrow_and_update();

    assert!(stream.resume_if_waiting());
    settle().await;
    assert_eq!(connector.connects(), 2);
    assert_eq!(stream.state(), ConnectionState::Connected);
    assert_eq!(stream.logs().len(), 1);

    // connected again, nothing to resume
    assert!(!stream.resume_if_waiting());
    stream.stop_stream();
    assert!(!stream.resume_if_waiting());
    assert_eq!(connector.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_resume_ignores_other_closes() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![text_frame(
        json!({ "type": "complete", "buildStatus": "success" }),
    )])]));
    let stream = stream(&connector, StreamOptions::default());

    stream.start_stream();
    settle().await;
    assert_eq!(stream.last_close(), Some(CloseReason::Completed));
    assert!(!stream.resume_if_waiting());
    assert_eq!(connector.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_resource_is_a_warning_not_a_wait() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![text_frame(
        json!({ "type": "error", "message": "Model not found" }),
    )])]));
    let stream = stream(&connector, StreamOptions::default());

    stream.start_stream();
    settle().await;

    assert_eq!(stream.state(), ConnectionState::Connected);
    assert_eq!(stream.status_text(), None);
    assert_eq!(stream.last_warning().as_deref(), Some("Model not found"));
    stream.stop_stream();
}

#[tokio::test(start_paused = true)]
async fn test_other_errors_are_warnings() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![
        text_frame(json!({ "type": "error", "message": "log shipper lagging" })),
        text_frame(json!({ "type": "status", "deploymentStatus": "deploying" })),
        text_frame(json!({ "nonsense": true })),
    ])]));
    let stream = stream(&connector, StreamOptions::default());

    stream.start_stream();
    settle().await;

    assert_eq!(stream.state(), ConnectionState::Connected);
    assert_eq!(stream.last_warning().as_deref(), Some("log shipper lagging"));
    assert_eq!(stream.status_text().as_deref(), Some("Deployment: deploying"));
    assert!(stream.logs().is_empty());
    stream.stop_stream();
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_retry() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![Frame::Closed {
        code: None,
    }])]));
    let stream = stream(&connector, StreamOptions::default());

    stream.start_stream();
    settle().await;
    assert_eq!(stream.state(), ConnectionState::PendingRetry);

    stream.stop_stream();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(connector.connects(), 1);
    assert_eq!(stream.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_a_noop_while_connected() {
    let connector = Arc::new(FakeConnector::new(vec![]));
    let stream = stream(&connector, StreamOptions::default());

    assert!(stream.start_stream());
    assert!(!stream.start_stream());
    settle().await;
    assert!(!stream.start_stream());

    assert_eq!(connector.connects(), 1);
    stream.stop_stream();
    settle().await;
    assert_eq!(connector.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_stream_disabled() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![Frame::Closed {
        code: Some(1011),
    }])]));
    let options = StreamOptions {
        auto_stream: false,
        ..Default::default()
    };
    let stream = stream(&connector, options);

    stream.start_stream();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(connector.connects(), 1);
    assert_eq!(stream.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_attempts() {
    let connector = Arc::new(FakeConnector::new(vec![
        Script::Refuse,
        Script::Refuse,
        Script::Refuse,
        Script::Refuse,
    ]));
    let options = StreamOptions {
        auto_stream: true,
        reconnect: ReconnectPolicy {
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            max_attempts: Some(2),
        },
    };
    let stream = stream(&connector, options);

    stream.start_stream();
    // connect at t=0, retry at t=1 and t=3, then give up
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.connects(), 3);
    assert_eq!(stream.reconnect_count(), 2);
    assert_eq!(stream.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_history_then_stream_appends_in_order() {
    let connector = Arc::new(FakeConnector::new(vec![Script::Frames(vec![
        log_frame("info", "streamed 1"),
        log_frame("error", "streamed 2"),
    ])]));
    let stream = stream(&connector, StreamOptions::default());

    let history: Vec<LogEntry> = (1..=3)
        .map(|n| LogEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, n).unwrap(),
            severity: Severity::Info,
            message: format!("history {}", n),
        })
        .collect();

    stream.load_history(history);
    stream.start_stream();
    settle().await;

    let messages: Vec<String> = stream.logs().entries().into_iter().map(|e| e.message).collect();
    assert_eq!(
        messages,
        vec!["history 1", "history 2", "history 3", "streamed 1", "streamed 2"]
    );
    assert_eq!(stream.logs().entries()[4].severity, Severity::Error);
    stream.stop_stream();
}
