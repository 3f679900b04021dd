//! Shared resource store

use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{Resource, ResourceId};

/// Capacity of the change notification channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notification published to subscribers
#[derive(Debug, Clone)]
pub enum StoreEvent<R> {
    /// A resource was inserted or merged; carries the merged value
    Updated(R),

    /// A resource was removed
    Removed(ResourceId),

    /// The selection changed
    Selected(Option<ResourceId>),
}

struct StoreState<R> {
    items: Vec<R>,
    selected: Option<ResourceId>,
}

/// In-memory store for one kind of resource.
///
/// Holds the ordered list plus the id of the selected item. Every write
/// merges into the existing entry so that concurrent writers (a poll tick and
/// a user action) do not clobber each other's fields.
pub struct ResourceStore<R: Resource> {
    state: RwLock<StoreState<R>>,
    events: broadcast::Sender<StoreEvent<R>>,
}

impl<R: Resource> ResourceStore<R> {
    /// Create an empty store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(StoreState {
                items: Vec::new(),
                selected: None,
            }),
            events,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent<R>> {
        self.events.subscribe()
    }

    /// Get a resource by id
    pub fn get(&self, id: &ResourceId) -> Option<R> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.items.iter().find(|r| r.id() == id).cloned()
    }

    /// Get every resource in list order
    pub fn list(&self) -> Vec<R> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.items.clone()
    }

    /// Get the selected resource
    pub fn selected(&self) -> Option<R> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let id = state.selected.as_ref()?;
        state.items.iter().find(|r| r.id() == id).cloned()
    }

    /// Merge a snapshot into the store, inserting it if unknown.
    ///
    /// Returns the merged value.
    pub fn merge(&self, incoming: R) -> R {
        let merged = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            merge_into(&mut state.items, incoming)
        };
        debug!("Store updated {} {}", R::KIND, merged.id());
        let _ = self.events.send(StoreEvent::Updated(merged.clone()));
        merged
    }

    /// Merge a freshly fetched list.
    ///
    /// Known entries are merged, new ones appended; entries missing from the
    /// list are kept since a list fetch may be filtered by parent.
    pub fn merge_list(&self, incoming: Vec<R>) {
        let merged: Vec<R> = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            incoming
                .into_iter()
                .map(|r| merge_into(&mut state.items, r))
                .collect()
        };
        for resource in merged {
            let _ = self.events.send(StoreEvent::Updated(resource));
        }
    }

    /// Select a resource by id, or clear the selection
    pub fn select(&self, id: Option<ResourceId>) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.selected = id.clone();
        }
        let _ = self.events.send(StoreEvent::Selected(id));
    }

    /// Remove a resource, clearing the selection if it pointed at it
    pub fn remove(&self, id: &ResourceId) -> Option<R> {
        let removed = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if state.selected.as_ref() == Some(id) {
                state.selected = None;
            }
            let pos = state.items.iter().position(|r| r.id() == id)?;
            Some(state.items.remove(pos))
        };
        let _ = self.events.send(StoreEvent::Removed(id.clone()));
        removed
    }

    /// Drop everything (logout/teardown)
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.items.clear();
        state.selected = None;
    }

    /// Get store size
    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.items.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Resource> Default for ResourceStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_into<R: Resource>(items: &mut Vec<R>, incoming: R) -> R {
    match items.iter_mut().find(|r| r.id() == incoming.id()) {
        Some(existing) => {
            existing.merge_from(incoming);
            existing.clone()
        }
        None => {
            items.push(incoming.clone());
            incoming
        }
    }
}
