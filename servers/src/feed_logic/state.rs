use std::sync::Arc;

use lib_common::core::{Broadcaster, DataStore, SubscriptionRegistry};

/// Shared handles injected into the axum router. The engine structures are
/// constructed once in `main` and cloned into every handler; nothing here
/// is an ambient global.
#[derive(Clone)]
pub struct AppState {
    pub store: DataStore,
    pub registry: SubscriptionRegistry,
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    pub fn new(
        store: DataStore,
        registry: SubscriptionRegistry,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            store,
            registry,
            broadcaster,
        }
    }
}
