//! Explicit listener registration for embedders that want callback
//! semantics rather than a broadcast channel.
//!
//! Callbacks are invoked synchronously at emit time, in registration order.
//! A slow listener therefore delays the emitter; listeners should hand off
//! real work to their own tasks.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::bus::SyncEvent;

/// Handle returned by [`ListenerRegistry::add`], used to remove a listener.
pub type ListenerId = u64;

type Listener = Box<dyn Fn(&SyncEvent) + Send + Sync>;

/// Registry of event callbacks with add/remove semantics.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<BTreeMap<ListenerId, Listener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, returning its removal handle.
    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .expect("listener registry lock poisoned")
            .insert(id, Box::new(listener));
        id
    }

    /// Remove a callback. Idempotent: returns `false` when the id is
    /// unknown or already removed.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners
            .write()
            .expect("listener registry lock poisoned")
            .remove(&id)
            .is_some()
    }

    /// Invoke every registered callback with the event.
    pub fn emit(&self, event: &SyncEvent) {
        let listeners = self
            .listeners
            .read()
            .expect("listener registry lock poisoned");
        for listener in listeners.values() {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .expect("listener registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
