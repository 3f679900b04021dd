//! Settings file management

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Client settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Write a daily-rolling log file under the storage layout
    #[serde(default)]
    pub log_to_file: bool,

    /// API configuration
    #[serde(default)]
    pub api: ApiSettings,

    /// Polling configuration
    #[serde(default)]
    pub polling: PollingSettings,

    /// Log stream configuration
    #[serde(default)]
    pub stream: StreamSettings,
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL for the backend API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing, deserialize_with = "deserialize_token")]
    pub token: Option<SecretString>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn deserialize_token<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let token: Option<String> = Option::deserialize(deserializer)?;
    Ok(token.map(SecretString::from))
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Status polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Interval between polls in milliseconds
    #[serde(default = "default_polling_interval")]
    pub interval_ms: u64,
}

fn default_polling_interval() -> u64 {
    10_000
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_polling_interval(),
        }
    }
}

/// Log stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Reconnect automatically after abnormal closes
    #[serde(default = "default_true")]
    pub auto_stream: bool,

    /// Delay before the first reconnect attempt in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Give up after this many consecutive failed attempts; unlimited if absent
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,

    /// Growth factor between attempts; 1.0 keeps the delay fixed
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for the reconnect delay in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub max_reconnect_delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_reconnect_delay() -> u64 {
    3_000
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            auto_stream: true,
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: None,
            backoff_multiplier: default_backoff_multiplier(),
            max_reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}
