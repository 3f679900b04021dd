//! Error types for deploywatch

use thiserror::Error;

/// Main error type for deploywatch
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WatchError {
    /// Whether the error is worth retrying on the next tick
    pub fn is_transient(&self) -> bool {
        match self {
            WatchError::HttpError(_) | WatchError::Timeout(_) | WatchError::WebSocketError(_) => true,
            WatchError::ApiError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<anyhow::Error> for WatchError {
    fn from(err: anyhow::Error) -> Self {
        WatchError::Internal(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for WatchError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        WatchError::WebSocketError(err.to_string())
    }
}
