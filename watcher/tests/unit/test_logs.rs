//! Log buffer and wire format tests

use chrono::{TimeZone, Utc};
use tokio_test::{assert_err, assert_ok};

use deploywatch::cache::logs::LogBuffer;
use deploywatch::models::log::{LogEntry, Severity};
use deploywatch::models::stream::StreamMessage;

fn entry(n: u32) -> LogEntry {
    LogEntry {
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, n).unwrap(),
        severity: Severity::Info,
        message: format!("line {}", n),
    }
}

#[tokio::test]
async fn test_buffer_publishes_growth() {
    let buffer = LogBuffer::new();
    let mut len = buffer.subscribe();

    buffer.extend((0..3).map(entry));
    len.changed().await.unwrap();
    assert_eq!(*len.borrow_and_update(), 3);

    buffer.extend(Vec::new());
    assert!(!len.has_changed().unwrap());

    buffer.push(entry(3));
    assert_eq!(*len.borrow_and_update(), 4);
    assert_eq!(buffer.entries_since(2).len(), 2);
    assert!(buffer.entries_since(10).is_empty());
}

#[test]
fn test_stream_log_without_timestamp_uses_receipt_time() {
    let received = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let message = assert_ok!(StreamMessage::parse(
        r#"{"type": "log", "level": "WARN", "message": "slow pull"}"#
    ));

    let entry = message.into_log_entry(received).unwrap();
    assert_eq!(entry.timestamp, received);
    assert_eq!(entry.severity, Severity::Warning);
}

#[test]
fn test_unknown_severity_is_info() {
    assert_eq!(Severity::from_wire("chatty"), Severity::Info);
}

#[test]
fn test_malformed_stream_message() {
    assert_err!(StreamMessage::parse("not json"));
    assert_err!(StreamMessage::parse(r#"{"type": "heartbeat"}"#));
}
