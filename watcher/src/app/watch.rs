//! Watch a single resource until it settles

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::app::options::WatchOptions;
use crate::app::render::{log_line, notice_line, warning_line, Render};
use crate::app::state::AppState;
use crate::cache::store::StoreEvent;
use crate::errors::WatchError;
use crate::models::{Resource, ResourceId, ResourceKind};
use crate::stream::coordinator::{ConnectionState, StreamCoordinator};
use crate::sync::polling::{PollingCoordinator, StartOutcome};

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How a watch session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The resource reached a terminal status
    Finished { failed: bool },

    /// The shutdown signal fired first
    Interrupted,
}

/// Follow one resource: snapshot, historical logs, live log tail and status
/// polling, until it turns terminal or `shutdown_signal` fires.
pub async fn watch<R: Render>(
    state: &AppState,
    coordinator: &PollingCoordinator<R>,
    id: ResourceId,
    options: &WatchOptions,
    shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> Result<WatchOutcome, WatchError> {
    let store = coordinator.store().clone();

    let snapshot: R = state.http_client.get_resource(&id).await?;
    let snapshot = store.merge(snapshot);
    store.select(Some(id.clone()));
    println!("{}", snapshot.summary());

    // subscribe after the snapshot merge so its own event is not printed again
    let mut events = store.subscribe();

    let stream = if options.follow_logs {
        Some(open_logs::<R>(state, &id).await)
    } else {
        None
    };
    let mut log_rx = stream.as_ref().map(|s| s.logs().subscribe());
    let mut notice_rx = stream.as_ref().map(|s| s.subscribe_notices());
    let mut printed = 0;
    let mut notices = Notices::default();
    if let Some(stream) = &stream {
        printed = print_new_logs(stream, printed);
        notices.print_changes(stream);
    }

    if snapshot.is_terminal() {
        info!("{} {} is already {}", R::KIND, id, snapshot.status_label());
        if let Some(stream) = &stream {
            stream.stop_stream();
        }
        return Ok(finished(&snapshot));
    }

    if coordinator.start_polling(id.clone()) == StartOutcome::Rejected {
        coordinator.retrack(id.clone());
    }

    let mut last_status = snapshot.status_label().to_string();
    let mut shutdown_signal = shutdown_signal;
    let outcome = loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Shutdown signal received, stopping watch of {} {}", R::KIND, id);
                break WatchOutcome::Interrupted;
            }
            event = events.recv() => {
                let current = match event {
                    Ok(StoreEvent::Updated(resource)) if resource.id() == &id => resource,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Skipped {} store events", skipped);
                        match store.get(&id) {
                            Some(resource) => resource,
                            None => continue,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(WatchError::Internal("store closed".to_string()));
                    }
                };

                if current.status_label() != last_status || R::KIND == ResourceKind::Pipeline {
                    println!("{}", current.summary());
                    last_status = current.status_label().to_string();
                }
                if current.is_terminal() {
                    break finished(&current);
                }
                if let Some(stream) = &stream {
                    stream.resume_if_waiting();
                }
            }
            _ = changed(&mut log_rx) => {
                if let Some(stream) = &stream {
                    printed = print_new_logs(stream, printed);
                }
            }
            _ = changed(&mut notice_rx) => {
                if let Some(stream) = &stream {
                    notices.print_changes(stream);
                }
            }
        }
    };

    coordinator.stop_polling(&id);

    if let Some(stream) = &stream {
        if matches!(outcome, WatchOutcome::Finished { .. }) {
            settle(stream, options.settle_timeout).await;
        }
        stream.stop_stream();
        print_new_logs(stream, printed);
        notices.print_changes(stream);
    }

    Ok(outcome)
}

async fn open_logs<R: Resource>(state: &AppState, id: &ResourceId) -> StreamCoordinator {
    let stream = state.stream_for(R::KIND, id.clone());
    match state.http_client.fetch_logs(R::KIND, id).await {
        Ok(history) => stream.load_history(history),
        Err(e) => warn!("Unable to fetch log history for {} {}: {}", R::KIND, id, e),
    }
    stream.start_stream();
    stream
}

fn finished<R: Resource>(resource: &R) -> WatchOutcome {
    WatchOutcome::Finished {
        failed: resource.is_failed(),
    }
}

/// Last stream status text and warning shown to the user
#[derive(Debug, Default)]
struct Notices {
    status_text: Option<String>,
    last_warning: Option<String>,
}

impl Notices {
    fn print_changes(&mut self, stream: &StreamCoordinator) {
        if let Some(text) = stream.status_text() {
            if self.status_text.as_ref() != Some(&text) {
                println!("{}", notice_line(&text));
                self.status_text = Some(text);
            }
        }

        if let Some(warning) = stream.last_warning() {
            if self.last_warning.as_ref() != Some(&warning) {
                println!("{}", warning_line(&warning));
                self.last_warning = Some(warning);
            }
        }
    }
}

async fn changed<T>(rx: &mut Option<watch::Receiver<T>>) {
    match rx {
        Some(rx) => {
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}

/// Give the stream a moment to deliver its final lines and close on its own
async fn settle(stream: &StreamCoordinator, timeout: Duration) {
    let closed = tokio::time::timeout(timeout, async {
        while matches!(
            stream.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
        }
    })
    .await;

    if closed.is_err() {
        info!("Log stream still open after {:?}, closing it", timeout);
    }
}
