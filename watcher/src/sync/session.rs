//! Polling session bookkeeping

use std::collections::{HashMap, HashSet};

use tokio::sync::oneshot;

use crate::models::ResourceId;

struct Session {
    generation: u64,
    shutdown_tx: oneshot::Sender<()>,
}

/// Registry of active polling sessions, at most one per resource id.
///
/// Each session gets a fresh generation number. A tick may only write state
/// while its generation is still the registered one, which keeps responses
/// that land after a stop (or after a restart) from resurrecting old state.
#[derive(Default)]
pub struct SessionRegistry {
    active: HashMap<ResourceId, Session>,
    finished: HashSet<ResourceId>,
    next_generation: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.active.contains_key(id)
    }

    pub fn is_current(&self, id: &ResourceId, generation: u64) -> bool {
        self.active
            .get(id)
            .is_some_and(|session| session.generation == generation)
    }

    /// Whether the resource stopped on a terminal status
    pub fn is_finished(&self, id: &ResourceId) -> bool {
        self.finished.contains(id)
    }

    /// Register a new session; the receiver resolves when it is stopped
    pub fn begin(&mut self, id: ResourceId) -> (u64, oneshot::Receiver<()>) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.active.insert(
            id,
            Session {
                generation,
                shutdown_tx,
            },
        );
        (generation, shutdown_rx)
    }

    /// Stop a session; returns false if none was active
    pub fn end(&mut self, id: &ResourceId) -> bool {
        match self.active.remove(id) {
            Some(session) => {
                let _ = session.shutdown_tx.send(());
                true
            }
            None => false,
        }
    }

    /// Stop a session because its resource reached a terminal status
    pub fn finish(&mut self, id: &ResourceId) {
        self.end(id);
        self.finished.insert(id.clone());
    }

    /// Forget the terminal mark so the resource can be tracked again
    pub fn clear_finished(&mut self, id: &ResourceId) -> bool {
        self.finished.remove(id)
    }

    /// Stop every session; returns how many were active
    pub fn end_all(&mut self) -> usize {
        let count = self.active.len();
        for (_, session) in self.active.drain() {
            let _ = session.shutdown_tx.send(());
        }
        count
    }

    pub fn active_ids(&self) -> Vec<ResourceId> {
        let mut ids: Vec<_> = self.active.keys().cloned().collect();
        ids.sort();
        ids
    }
}
