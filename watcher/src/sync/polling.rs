//! Polling coordinator
//!
//! Keeps store entries eventually consistent with the server by re-fetching
//! each tracked resource on a timer, one timer per resource.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cache::store::ResourceStore;
use crate::models::{Resource, ResourceId};
use crate::sync::session::SessionRegistry;
use crate::sync::source::StatusSource;
use crate::workers::poller;

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session was created
    Started,

    /// A session for the id already exists; nothing changed
    AlreadyActive,

    /// The resource already reached a terminal status; use `retrack`
    Rejected,
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stopped,
}

/// Everything one polling session needs to run a tick
pub struct PollTarget<R: Resource> {
    id: ResourceId,
    generation: u64,
    request_timeout: Duration,
    source: Arc<dyn StatusSource<R>>,
    store: Arc<ResourceStore<R>>,
    registry: Arc<Mutex<SessionRegistry>>,
}

impl<R: Resource> PollTarget<R> {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Fetch once and merge the result.
    ///
    /// Fetch failures and timeouts skip the tick. A response that arrives
    /// after the session was stopped or replaced is dropped.
    pub async fn tick(&self) -> TickOutcome {
        let fetch = self.source.fetch_status(&self.id);
        let resource = match tokio::time::timeout(self.request_timeout, fetch).await {
            Ok(Ok(resource)) => resource,
            Ok(Err(e)) if e.is_transient() => {
                warn!("Status fetch for {} {} failed, skipping tick: {}", R::KIND, self.id, e);
                return TickOutcome::Continue;
            }
            Ok(Err(e)) => {
                // not expected to clear up on its own, but the next tick still runs
                error!("Status fetch for {} {} rejected, skipping tick: {}", R::KIND, self.id, e);
                return TickOutcome::Continue;
            }
            Err(_) => {
                warn!(
                    "Status fetch for {} {} timed out after {:?}, skipping tick",
                    R::KIND,
                    self.id,
                    self.request_timeout
                );
                return TickOutcome::Continue;
            }
        };

        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        if !registry.is_current(&self.id, self.generation) {
            debug!("Discarding late status for {} {}", R::KIND, self.id);
            return TickOutcome::Stopped;
        }

        let terminal = resource.is_terminal();
        let merged = self.store.merge(resource);

        if terminal {
            registry.finish(&self.id);
            info!(
                "{} {} reached terminal status '{}', polling stopped",
                R::KIND,
                self.id,
                merged.status_label()
            );
            return TickOutcome::Stopped;
        }

        TickOutcome::Continue
    }
}

/// Timer-driven re-fetch loops, at most one per resource id
pub struct PollingCoordinator<R: Resource> {
    source: Arc<dyn StatusSource<R>>,
    store: Arc<ResourceStore<R>>,
    options: poller::Options,
    registry: Arc<Mutex<SessionRegistry>>,
}

impl<R: Resource> Clone for PollingCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            store: self.store.clone(),
            options: self.options.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<R: Resource> PollingCoordinator<R> {
    /// Create a new coordinator writing into `store`
    pub fn new(
        source: Arc<dyn StatusSource<R>>,
        store: Arc<ResourceStore<R>>,
        options: poller::Options,
    ) -> Self {
        Self {
            source,
            store,
            options,
            registry: Arc::new(Mutex::new(SessionRegistry::new())),
        }
    }

    pub fn store(&self) -> &Arc<ResourceStore<R>> {
        &self.store
    }

    /// Start polling at the configured interval
    pub fn start_polling(&self, id: ResourceId) -> StartOutcome {
        self.start_polling_every(id, self.options.interval)
    }

    /// Start polling at a custom interval.
    ///
    /// Idempotent: a second call for an active id changes nothing. Must be
    /// called from within a tokio runtime.
    pub fn start_polling_every(&self, id: ResourceId, interval: Duration) -> StartOutcome {
        let (generation, shutdown_rx) = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            if registry.contains(&id) {
                debug!("Already polling {} {}", R::KIND, id);
                return StartOutcome::AlreadyActive;
            }
            if registry.is_finished(&id) {
                debug!("{} {} already finished, not polling again", R::KIND, id);
                return StartOutcome::Rejected;
            }
            registry.begin(id.clone())
        };

        info!("Polling {} {} every {:?}", R::KIND, id, interval);

        let target = PollTarget {
            id,
            generation,
            request_timeout: self.options.request_timeout,
            source: self.source.clone(),
            store: self.store.clone(),
            registry: self.registry.clone(),
        };
        let options = poller::Options {
            interval,
            ..self.options.clone()
        };

        tokio::spawn(async move {
            poller::run(
                &options,
                &target,
                tokio::time::sleep,
                Box::pin(async move {
                    let _ = shutdown_rx.await;
                }),
            )
            .await;
        });

        StartOutcome::Started
    }

    /// Track a resource again after it finished, e.g. for a manual retry
    pub fn retrack(&self, id: ResourceId) -> StartOutcome {
        {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.clear_finished(&id);
        }
        self.start_polling(id)
    }

    /// Stop polling a resource; no-op if it is not being polled
    pub fn stop_polling(&self, id: &ResourceId) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let stopped = registry.end(id);
        if stopped {
            info!("Stopped polling {} {}", R::KIND, id);
        }
        stopped
    }

    /// Stop every session (logout/teardown)
    pub fn stop_all_polling(&self) -> usize {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let count = registry.end_all();
        if count > 0 {
            info!("Stopped {} {} poller(s)", count, R::KIND);
        }
        count
    }

    pub fn is_polling(&self, id: &ResourceId) -> bool {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.contains(id)
    }

    /// Whether polling stopped because the resource reached a terminal status
    pub fn has_finished(&self, id: &ResourceId) -> bool {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.is_finished(id)
    }

    pub fn active_ids(&self) -> Vec<ResourceId> {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.active_ids()
    }
}
