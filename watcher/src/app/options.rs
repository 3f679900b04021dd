//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::storage::settings::Settings;
use crate::stream::coordinator::{ReconnectPolicy, StreamOptions};
use crate::workers::poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Backend API base URL
    pub api_base_url: String,

    /// Bearer token for the API and the log stream
    pub token: Option<SecretString>,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,

    /// Poller worker options
    pub poller: poller::Options,

    /// Log stream options
    pub stream: StreamOptions,

    /// Watch command options
    pub watch: WatchOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
            poller: poller::Options::default(),
            stream: StreamOptions::default(),
            watch: WatchOptions::default(),
        }
    }
}

impl AppOptions {
    /// Map the settings file onto runtime options
    pub fn from_settings(settings: &Settings) -> Self {
        let request_timeout = Duration::from_secs(settings.api.request_timeout_secs);
        let stream = &settings.stream;

        Self {
            api_base_url: settings.api.base_url.clone(),
            token: settings.api.token.clone(),
            request_timeout,
            poller: poller::Options {
                interval: Duration::from_millis(settings.polling.interval_ms),
                request_timeout,
                ..Default::default()
            },
            stream: StreamOptions {
                auto_stream: stream.auto_stream,
                reconnect: ReconnectPolicy {
                    base_delay: Duration::from_millis(stream.reconnect_delay_ms),
                    multiplier: stream.backoff_multiplier,
                    max_delay: Duration::from_millis(stream.max_reconnect_delay_ms),
                    max_attempts: stream.max_reconnect_attempts,
                },
            },
            watch: WatchOptions::default(),
        }
    }
}

/// Options for a single watch session
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Fetch historical logs and tail the log stream
    pub follow_logs: bool,

    /// How long to keep draining the stream after the resource turns terminal
    pub settle_timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            follow_logs: true,
            settle_timeout: Duration::from_secs(5),
        }
    }
}
