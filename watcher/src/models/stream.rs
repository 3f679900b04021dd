//! Messages received on the live log stream

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::WatchError;
use crate::models::log::{LogEntry, Severity};

/// Phrases the backend uses when the log stream is requested before the job exists
const NOT_READY_MARKERS: [&str; 3] = ["not ready", "not started", "not yet"];

/// "not found" only counts when it names the job behind the stream
const MISSING_JOB_MARKERS: [&str; 2] = ["job not found", "no job"];

/// A server-to-client stream message
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    Log {
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
        #[serde(default, alias = "level")]
        severity: String,
        message: String,
    },
    Status {
        #[serde(default, rename = "deploymentStatus", alias = "deployment_status")]
        deployment_status: Option<String>,
        #[serde(default, rename = "buildStatus", alias = "build_status")]
        build_status: Option<String>,
    },
    Complete {
        #[serde(default, rename = "buildStatus", alias = "build_status")]
        build_status: Option<String>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl StreamMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, WatchError> {
        serde_json::from_str(text).map_err(|e| WatchError::DecodeError(e.to_string()))
    }

    /// Convert a `log` message into a log entry, stamping it with
    /// `received_at` when the server omitted a timestamp
    pub fn into_log_entry(self, received_at: DateTime<Utc>) -> Option<LogEntry> {
        match self {
            StreamMessage::Log {
                timestamp,
                severity,
                message,
            } => Some(LogEntry {
                timestamp: timestamp.unwrap_or(received_at),
                severity: Severity::from_wire(&severity),
                message,
            }),
            _ => None,
        }
    }

    /// Whether an `error` message only says the resource has no job yet
    pub fn is_not_ready(&self) -> bool {
        match self {
            StreamMessage::Error { message } => {
                let message = message.to_lowercase();
                NOT_READY_MARKERS
                    .iter()
                    .chain(MISSING_JOB_MARKERS.iter())
                    .any(|marker| message.contains(marker))
            }
            _ => false,
        }
    }
}
