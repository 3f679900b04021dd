//! Polling worker for a single resource

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::models::Resource;
use crate::sync::polling::{PollTarget, TickOutcome};

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Initial delay before the first interval starts
    pub initial_delay: Duration,

    /// Upper bound on a single status fetch
    pub request_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10_000),
            initial_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Run the poller worker until the target stops or shutdown is signalled
pub async fn run<R, S, F>(
    options: &Options,
    target: &PollTarget<R>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    R: Resource,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    debug!(
        "Poller for {} {} starting (interval {:?})",
        R::KIND,
        target.id(),
        options.interval
    );

    tokio::select! {
        _ = &mut shutdown_signal => {
            debug!("Poller for {} {} stopped before first tick", R::KIND, target.id());
            return;
        }
        _ = sleep_fn(options.initial_delay) => {}
    }

    loop {
        // Check for shutdown
        tokio::select! {
            _ = &mut shutdown_signal => {
                debug!("Poller for {} {} shutting down...", R::KIND, target.id());
                return;
            }
            _ = sleep_fn(options.interval) => {
                // Continue with poll
            }
        }

        if target.tick().await == TickOutcome::Stopped {
            debug!("Poller for {} {} finished", R::KIND, target.id());
            return;
        }
    }
}
