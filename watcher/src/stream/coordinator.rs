//! Stream coordinator
//!
//! Owns the lifecycle of one resource's live log connection: connect, buffer
//! incoming entries, detect abnormal closure and reconnect after a delay
//! unless told to stop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::logs::LogBuffer;
use crate::errors::WatchError;
use crate::models::log::LogEntry;
use crate::models::stream::StreamMessage;
use crate::models::{ResourceId, ResourceKind};
use crate::stream::connector::{LogConnection, LogConnector};
use crate::utils::{calc_exp_backoff, CooldownOptions};
use crate::workers::log_stream;

/// Status text shown while the backend has not allocated the job yet
pub const WAITING_STATUS: &str = "Waiting for logs to become available...";

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Disconnected abnormally with a reconnect scheduled
    PendingRetry,
}

/// Why a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The server sent `complete`
    Completed,

    /// The server reported the resource is not ready yet
    NotReady,

    /// `stop_stream` was called
    Stopped,

    /// The server closed with code 1000
    Normal,

    /// Anything else: dropped connection, unexpected code, failed connect
    Abnormal(String),
}

impl CloseReason {
    pub fn is_deliberate(&self) -> bool {
        !matches!(self, CloseReason::Abnormal(_))
    }
}

/// Reconnect timing after an abnormal close.
///
/// The default reconnects every 3 s forever. A multiplier above 1 turns it
/// into exponential backoff capped at `max_delay`; `max_attempts` bounds the
/// number of consecutive reconnects.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(3000))
    }
}

impl ReconnectPolicy {
    /// Same delay every time, no attempt limit
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
            max_attempts: None,
        }
    }

    /// Delay before reconnect number `attempt` (0-based), or `None` once the
    /// attempt limit is used up
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| attempt >= max) {
            return None;
        }
        let cooldown = CooldownOptions {
            base_delay: self.base_delay,
            max_delay: self.max_delay.max(self.base_delay),
            multiplier: self.multiplier.max(1.0),
        };
        Some(calc_exp_backoff(&cooldown, attempt))
    }
}

/// Stream coordinator options
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Reconnect after abnormal closes
    pub auto_stream: bool,

    pub reconnect: ReconnectPolicy,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            auto_stream: true,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

struct StreamState {
    connection: ConnectionState,
    wants_retry: bool,
    generation: u64,
    failed_attempts: u32,
    reconnects: u32,
    status_text: Option<String>,
    last_warning: Option<String>,
    last_close: Option<CloseReason>,
    stop_tx: Option<oneshot::Sender<()>>,
    retry_handle: Option<JoinHandle<()>>,
}

struct Shared {
    kind: ResourceKind,
    id: ResourceId,
    connector: Arc<dyn LogConnector>,
    options: StreamOptions,
    logs: Arc<LogBuffer>,
    notices: watch::Sender<u64>,
    state: Mutex<StreamState>,
}

/// Live log tail for one resource; cheap to clone
#[derive(Clone)]
pub struct StreamCoordinator {
    shared: Arc<Shared>,
}

impl StreamCoordinator {
    pub fn new(
        kind: ResourceKind,
        id: ResourceId,
        connector: Arc<dyn LogConnector>,
        options: StreamOptions,
    ) -> Self {
        let (notices, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                kind,
                id,
                connector,
                logs: Arc::new(LogBuffer::new()),
                notices,
                state: Mutex::new(StreamState {
                    connection: ConnectionState::Disconnected,
                    wants_retry: options.auto_stream,
                    generation: 0,
                    failed_attempts: 0,
                    reconnects: 0,
                    status_text: None,
                    last_warning: None,
                    last_close: None,
                    stop_tx: None,
                    retry_handle: None,
                }),
                options,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StreamState> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn kind(&self) -> ResourceKind {
        self.shared.kind
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.shared.id
    }

    /// Buffered log entries (historical first, then streamed)
    pub fn logs(&self) -> Arc<LogBuffer> {
        self.shared.logs.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().connection
    }

    /// Display-only status text from `status`/`complete`/not-ready messages
    pub fn status_text(&self) -> Option<String> {
        self.lock().status_text.clone()
    }

    /// Most recent non-fatal error reported by the server
    pub fn last_warning(&self) -> Option<String> {
        self.lock().last_warning.clone()
    }

    /// Bumped whenever `status_text` or `last_warning` changes
    pub fn subscribe_notices(&self) -> watch::Receiver<u64> {
        self.shared.notices.subscribe()
    }

    /// Why the most recent connection ended, if one has
    pub fn last_close(&self) -> Option<CloseReason> {
        self.lock().last_close.clone()
    }

    /// Reopen a stream the server turned away as not ready.
    ///
    /// Call this when the resource has moved on; it does nothing unless the
    /// last connection ended with `CloseReason::NotReady`.
    pub fn resume_if_waiting(&self) -> bool {
        let mut state = self.lock();
        if state.connection != ConnectionState::Disconnected
            || state.last_close != Some(CloseReason::NotReady)
        {
            return false;
        }
        info!(
            "Retrying log stream for {} {} now that it may be ready",
            self.shared.kind, self.shared.id
        );
        state.wants_retry = self.shared.options.auto_stream;
        self.begin_connect(&mut state)
    }

    fn set_status_text(&self, text: String) {
        self.lock().status_text = Some(text);
        self.shared.notices.send_modify(|n| *n += 1);
    }

    fn set_warning(&self, message: String) {
        self.lock().last_warning = Some(message);
        self.shared.notices.send_modify(|n| *n += 1);
    }

    /// Number of reconnects performed so far
    pub fn reconnect_count(&self) -> u32 {
        self.lock().reconnects
    }

    /// Seed the buffer with the one-shot historical fetch
    pub fn load_history(&self, entries: Vec<LogEntry>) {
        debug!(
            "Loaded {} historical log entries for {} {}",
            entries.len(),
            self.shared.kind,
            self.shared.id
        );
        self.shared.logs.extend(entries);
    }

    /// Open the stream; no-op while connecting or connected.
    ///
    /// Re-enables auto-retry if a previous `stop_stream` disabled it. Must be
    /// called from within a tokio runtime.
    pub fn start_stream(&self) -> bool {
        let mut state = self.lock();
        state.wants_retry = self.shared.options.auto_stream;
        self.begin_connect(&mut state)
    }

    /// Close the stream and cancel any pending reconnect
    pub fn stop_stream(&self) {
        let mut state = self.lock();
        state.wants_retry = false;
        state.last_close = Some(CloseReason::Stopped);
        if let Some(handle) = state.retry_handle.take() {
            handle.abort();
        }
        if let Some(stop_tx) = state.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if state.connection != ConnectionState::Disconnected {
            info!("Stopping log stream for {} {}", self.shared.kind, self.shared.id);
        }
        state.connection = ConnectionState::Disconnected;
    }

    fn begin_connect(&self, state: &mut StreamState) -> bool {
        if matches!(
            state.connection,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!(
                "Log stream for {} {} already {:?}",
                self.shared.kind, self.shared.id, state.connection
            );
            return false;
        }

        if let Some(handle) = state.retry_handle.take() {
            handle.abort();
        }

        state.generation += 1;
        state.connection = ConnectionState::Connecting;
        let generation = state.generation;
        let (stop_tx, stop_rx) = oneshot::channel();
        state.stop_tx = Some(stop_tx);

        let coordinator = self.clone();
        tokio::spawn(async move {
            log_stream::run(
                &coordinator,
                generation,
                Box::pin(async move {
                    let _ = stop_rx.await;
                }),
            )
            .await;
        });

        true
    }

    fn schedule_retry(&self, state: &mut StreamState, delay: Duration) {
        state.connection = ConnectionState::PendingRetry;
        let generation = state.generation;
        let coordinator = self.clone();
        state.retry_handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            coordinator.retry(generation);
        }));
    }

    fn retry(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation
            || state.connection != ConnectionState::PendingRetry
            || !state.wants_retry
        {
            return;
        }
        // this is the running retry task; let it finish rather than abort it
        state.retry_handle.take();
        state.reconnects += 1;
        info!(
            "Reconnecting log stream for {} {} (attempt {})",
            self.shared.kind, self.shared.id, state.failed_attempts
        );
        self.begin_connect(&mut state);
    }

    pub(crate) async fn open(&self) -> Result<Box<dyn LogConnection>, WatchError> {
        self.shared
            .connector
            .connect(self.shared.kind, &self.shared.id)
            .await
    }

    /// Mark the connection open; false if this attempt was superseded
    pub(crate) fn on_open(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation || state.connection != ConnectionState::Connecting {
            return false;
        }
        state.connection = ConnectionState::Connected;
        state.failed_attempts = 0;
        if let Some(handle) = state.retry_handle.take() {
            handle.abort();
        }
        info!("Log stream connected for {} {}", self.shared.kind, self.shared.id);
        true
    }

    /// Apply one text frame; returns a reason when the connection should
    /// now be closed deliberately
    pub(crate) fn handle_text(&self, text: &str) -> Option<CloseReason> {
        let message = match StreamMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    "Dropping malformed message on {} {} log stream: {}",
                    self.shared.kind, self.shared.id, e
                );
                return None;
            }
        };

        let not_ready = message.is_not_ready();
        match message {
            StreamMessage::Log { .. } => {
                if let Some(entry) = message.into_log_entry(Utc::now()) {
                    self.shared.logs.push(entry);
                }
                None
            }
            StreamMessage::Status {
                deployment_status,
                build_status,
            } => {
                self.set_status_text(compose_status(deployment_status, build_status));
                None
            }
            StreamMessage::Complete { build_status } => {
                let text = match build_status {
                    Some(status) => format!("Completed: {}", status),
                    None => "Completed".to_string(),
                };
                info!("Log stream for {} {} complete ({})", self.shared.kind, self.shared.id, text);
                self.set_status_text(text);
                Some(CloseReason::Completed)
            }
            StreamMessage::Error { .. } if not_ready => {
                debug!("{} {} not ready for streaming yet", self.shared.kind, self.shared.id);
                self.set_status_text(WAITING_STATUS.to_string());
                Some(CloseReason::NotReady)
            }
            StreamMessage::Error { message } => {
                warn!(
                    "Log stream for {} {} reported an error: {}",
                    self.shared.kind, self.shared.id, message
                );
                self.set_warning(message);
                None
            }
        }
    }

    /// Record the end of a connection and schedule a reconnect if warranted
    pub(crate) fn on_closed(&self, generation: u64, reason: CloseReason) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        state.stop_tx = None;
        state.connection = ConnectionState::Disconnected;
        state.last_close = Some(reason.clone());

        let detail = match reason {
            CloseReason::Abnormal(detail) => detail,
            reason => {
                debug!(
                    "Log stream for {} {} closed: {:?}",
                    self.shared.kind, self.shared.id, reason
                );
                return;
            }
        };

        if !self.shared.options.auto_stream || !state.wants_retry {
            info!(
                "Log stream for {} {} closed ({}), not reconnecting",
                self.shared.kind, self.shared.id, detail
            );
            return;
        }

        let attempt = state.failed_attempts;
        state.failed_attempts += 1;

        match self.shared.options.reconnect.delay_for(attempt) {
            Some(delay) => {
                warn!(
                    "Log stream for {} {} closed abnormally ({}), reconnecting in {:?}",
                    self.shared.kind, self.shared.id, detail, delay
                );
                self.schedule_retry(&mut state, delay);
            }
            None => {
                error!(
                    "Log stream for {} {} closed abnormally ({}), giving up after {} attempts",
                    self.shared.kind, self.shared.id, detail, attempt
                );
                state.wants_retry = false;
            }
        }
    }
}

fn compose_status(deployment_status: Option<String>, build_status: Option<String>) -> String {
    let parts: Vec<String> = [("Deployment", deployment_status), ("Build", build_status)]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| format!("{}: {}", label, v)))
        .collect();

    if parts.is_empty() {
        "Status update".to_string()
    } else {
        parts.join(" | ")
    }
}
