//! # Subscription Registry
//!
//! Tracks which topics every connected client wants pushed to it. Each live
//! client owns exactly one entry (possibly empty); the entry is created when
//! the connection is accepted and removed exactly once at teardown.
//!
//! Subscribing on an id that was never registered (or was already torn
//! down) is a deliberate no-op rather than a lazy registration: every
//! connection is registered at accept time, so an unknown id here can only
//! mean a client that is already gone, and resurrecting its entry would
//! leak it forever.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Cloneable handle to the shared client -> topics map.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    subscriptions: Arc<Mutex<HashMap<usize, HashSet<String>>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty subscription set for a new client. No-op if the id
    /// is already registered.
    pub fn register(&self, client_id: usize) {
        let mut subs = self.subscriptions.lock().expect("Registry lock poisoned");
        subs.entry(client_id).or_default();
    }

    /// Remove the client's entry entirely. Idempotent.
    pub fn unregister(&self, client_id: usize) {
        let mut subs = self.subscriptions.lock().expect("Registry lock poisoned");
        subs.remove(&client_id);
    }

    /// Add `topics` to the client's set with set-union semantics:
    /// duplicates within the input or against the existing set collapse.
    /// No-op for an unregistered id.
    pub fn subscribe(&self, client_id: usize, topics: &[String]) {
        let mut subs = self.subscriptions.lock().expect("Registry lock poisoned");
        if let Some(client_subs) = subs.get_mut(&client_id) {
            for topic in topics {
                client_subs.insert(topic.clone());
            }
        }
    }

    /// Remove `topics` from the client's set, ignoring any not present.
    /// `None` clears the whole set (unsubscribe-all).
    pub fn unsubscribe(&self, client_id: usize, topics: Option<&[String]>) {
        let mut subs = self.subscriptions.lock().expect("Registry lock poisoned");
        if let Some(client_subs) = subs.get_mut(&client_id) {
            match topics {
                None => client_subs.clear(),
                Some(topics) => {
                    for topic in topics {
                        client_subs.remove(topic);
                    }
                }
            }
        }
    }

    /// The client's current topic set. Empty for an unknown id, never an
    /// error; the broadcaster treats both the same way.
    pub fn topics_of(&self, client_id: usize) -> HashSet<String> {
        let subs = self.subscriptions.lock().expect("Registry lock poisoned");
        subs.get(&client_id).cloned().unwrap_or_default()
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        let subs = self.subscriptions.lock().expect("Registry lock poisoned");
        subs.len()
    }
}
