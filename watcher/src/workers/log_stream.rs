//! Log stream worker: drives one connection attempt from open to close

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, error};

use crate::stream::connector::{Frame, NORMAL_CLOSE};
use crate::stream::coordinator::{CloseReason, StreamCoordinator};

/// Run a single connection until it closes or the stop signal fires.
///
/// The outcome is reported back to the coordinator, which decides whether to
/// reconnect.
pub async fn run(
    coordinator: &StreamCoordinator,
    generation: u64,
    mut stop_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    let opened = tokio::select! {
        _ = &mut stop_signal => {
            debug!("Log stream for {} {} stopped while connecting", coordinator.kind(), coordinator.resource_id());
            return;
        }
        result = coordinator.open() => result,
    };

    let mut connection = match opened {
        Ok(connection) => connection,
        Err(e) => {
            error!(
                "Failed to connect to log stream for {} {}: {}",
                coordinator.kind(),
                coordinator.resource_id(),
                e
            );
            coordinator.on_closed(generation, CloseReason::Abnormal(e.to_string()));
            return;
        }
    };

    if !coordinator.on_open(generation) {
        connection.close().await;
        return;
    }

    let reason = loop {
        let frame = tokio::select! {
            _ = &mut stop_signal => None,
            frame = connection.next_frame() => Some(frame),
        };

        match frame {
            None => {
                connection.close().await;
                break CloseReason::Stopped;
            }
            Some(Frame::Text(text)) => {
                if let Some(reason) = coordinator.handle_text(&text) {
                    connection.close().await;
                    break reason;
                }
            }
            Some(Frame::Closed { code: Some(NORMAL_CLOSE) }) => break CloseReason::Normal,
            Some(Frame::Closed { code: Some(code) }) => {
                break CloseReason::Abnormal(format!("closed with code {}", code))
            }
            Some(Frame::Closed { code: None }) => {
                break CloseReason::Abnormal("connection dropped".to_string())
            }
            Some(Frame::Failed(e)) => break CloseReason::Abnormal(e),
        }
    };

    coordinator.on_closed(generation, reason);
}
