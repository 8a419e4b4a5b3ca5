//! # Core Engine Module
//!
//! This module forms the heart of the real-time feed distribution engine.
//! It aggregates the components required for storing the latest reading of
//! every topic, tracking who wants which topic, and fanning fresh data out
//! to all connected clients once per tick. The components here are
//! asynchronous, thread-safe, and injected into the server layer at
//! construction, never reached through ambient globals.
//!
//! ## Core Components:
//!
//! - **`store`**: The in-memory value store. One entry per topic key,
//!   overwritten in place on every tick; only the latest reading survives.
//!
//! - **`registry`**: The subscription manager. Keeps one set of topic keys
//!   per connected client and guarantees that a torn-down client can never
//!   reappear in a later tick.
//!
//! - **`broadcast`**: The tick-driven fan-out loop. Reconciles "what the
//!   store holds" against "what each client subscribed to" and pushes one
//!   JSON frame per client per tick, dropping clients whose channel died.
//!
//! - **`producer`**: The pluggable tick producer. The engine only requires
//!   that *something* writes values into the store on a schedule; the
//!   bundled synthetic producer simulates stock prices and sensor readings.

/// The in-memory topic/value store.
pub mod store;
/// Per-client topic subscription sets.
pub mod registry;
/// The tick-driven broadcaster that fans data out to clients.
pub mod broadcast;
/// The pluggable tick producer and its run loop.
pub mod producer;

// --- Public API Re-exports ---
// Make the primary structs from the core modules directly accessible.
pub use broadcast::Broadcaster;
pub use producer::{SyntheticProducer, TickProducer};
pub use registry::SubscriptionRegistry;
pub use store::{unix_time_secs, DataStore, Reading};
