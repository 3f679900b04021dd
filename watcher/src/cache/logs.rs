//! Append-only log buffer

use std::sync::RwLock;

use tokio::sync::watch;

use crate::models::log::LogEntry;

/// Append-only sequence of log entries for one resource.
///
/// Historical entries are loaded first and streamed entries are appended in
/// arrival order. Nothing is ever removed or reordered. Every growth is
/// published as the new length so renderers can scroll to the newest entry.
pub struct LogBuffer {
    entries: RwLock<Vec<LogEntry>>,
    len_tx: watch::Sender<usize>,
}

impl LogBuffer {
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            entries: RwLock::new(Vec::new()),
            len_tx,
        }
    }

    /// Append one entry
    pub fn push(&self, entry: LogEntry) {
        self.extend(std::iter::once(entry));
    }

    /// Append entries in order
    pub fn extend(&self, batch: impl IntoIterator<Item = LogEntry>) {
        let len = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let before = entries.len();
            entries.extend(batch);
            if entries.len() == before {
                return;
            }
            entries.len()
        };
        self.len_tx.send_replace(len);
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Entries from `offset` onwards, for incremental rendering
    pub fn entries_since(&self, offset: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(offset..).map(<[LogEntry]>::to_vec).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Watch the buffer length; changes on every append
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}
