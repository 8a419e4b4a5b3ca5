//! # In-Memory Value Store
//!
//! Holds the latest reading for every topic key the producer has written.
//! There is no history: a write replaces whatever was there before, and a
//! key that was never written is simply absent. Absence is a normal state
//! ("not yet produced"), never an error and never a null value.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Current Unix time as float seconds, matching the wire format of the
/// `timestamp` field on delivered readings.
pub fn unix_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// A topic value paired with the moment it was handed out. The timestamp is
/// captured at delivery time, not tick time, so two clients receiving the
/// same value in the same tick may see slightly different timestamps.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Reading {
    pub value: f64,
    pub timestamp: f64,
}

impl Reading {
    /// Wrap a value with the current time.
    pub fn now(value: f64) -> Self {
        Self {
            value,
            timestamp: unix_time_secs(),
        }
    }
}

/// Cloneable handle to the shared topic/value map. All clones point at the
/// same underlying map; the producer writes through one clone while the
/// broadcaster and the query routes read through others.
#[derive(Clone, Default)]
pub struct DataStore {
    values: Arc<Mutex<HashMap<String, f64>>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional overwrite. The write is visible to the next broadcast
    /// tick; there are no error conditions.
    pub fn set(&self, key: &str, value: f64) {
        let mut values = self.values.lock().expect("DataStore lock poisoned");
        values.insert(key.to_string(), value);
    }

    /// Latest value for `key`, or `None` if it was never produced.
    pub fn get(&self, key: &str) -> Option<f64> {
        let values = self.values.lock().expect("DataStore lock poisoned");
        values.get(key).copied()
    }

    /// The store restricted to `keys`. Keys with no stored value are
    /// silently omitted; the broadcaster relies on this to distinguish
    /// "subscribed but no data yet" from "has data".
    pub fn snapshot(&self, keys: &HashSet<String>) -> HashMap<String, f64> {
        let values = self.values.lock().expect("DataStore lock poisoned");
        keys.iter()
            .filter_map(|key| values.get(key).map(|v| (key.clone(), *v)))
            .collect()
    }

    /// Full flat dump of the store, used by the `/data` query route.
    pub fn all(&self) -> HashMap<String, f64> {
        let values = self.values.lock().expect("DataStore lock poisoned");
        values.clone()
    }

    /// Number of topics currently holding a value.
    pub fn len(&self) -> usize {
        let values = self.values.lock().expect("DataStore lock poisoned");
        values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
