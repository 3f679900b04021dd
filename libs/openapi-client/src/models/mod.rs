//! API models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single log record as returned by the historical logs endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "level")]
    pub severity: String,
    pub message: String,
}

/// Historical logs response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default, alias = "logs")]
    pub entries: Vec<LogRecord>,
}

/// List endpoints either wrap results in an object or return a bare array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Wrapped {
        #[serde(alias = "builds", alias = "deployments", alias = "pipelines")]
        items: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Wrapped { items } => items,
            ListResponse::Bare(items) => items,
        }
    }
}

/// Pipeline creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePipelineRequest {
    pub notebook_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

/// Traffic split update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficUpdateRequest {
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// Model hot-reload request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReloadModelRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_uri: Option<String>,
}

/// Rollback request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(alias = "detail")]
    pub message: String,
    #[serde(default)]
    pub error: Option<String>,
}
