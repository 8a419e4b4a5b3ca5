//! # Tick-Driven Broadcaster
//!
//! The fan-out engine. Once per tick it walks the live connection set and,
//! for each client independently, builds the snapshot of its subscribed
//! topics that currently hold data and pushes the result as one JSON frame.
//!
//! ## Design:
//!
//! 1. **Channel-decoupled delivery**: every client is represented by the
//!    sending half of an unbounded MPSC channel. The WebSocket task owns the
//!    receiving half and forwards frames to the socket. A send here can
//!    never block on a slow peer, and a failed send means the receiving
//!    task is gone, which is the only delivery failure at this layer.
//!
//! 2. **Stable iteration**: each tick iterates over a drained copy of the
//!    connection list, so tearing one client down mid-tick can neither skip
//!    nor double-visit a sibling.
//!
//! 3. **Failure is teardown**: a failed send removes the client from both
//!    the live set and the subscription registry, synchronously, with no
//!    retry. A torn-down client is never visited again.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::core::registry::SubscriptionRegistry;
use crate::core::store::{DataStore, Reading};

/// Owns the live connection set and drives per-tick delivery. Constructed
/// once with the store and registry it reads, and shared behind an `Arc`
/// between the tick loop and the connection handlers.
pub struct Broadcaster {
    store: DataStore,
    registry: SubscriptionRegistry,
    clients: Mutex<HashMap<usize, mpsc::UnboundedSender<String>>>,
}

impl Broadcaster {
    pub fn new(store: DataStore, registry: SubscriptionRegistry) -> Self {
        Self {
            store,
            registry,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new client with an empty subscription set.
    ///
    /// Returns the receiving half of the client's frame channel; the
    /// caller's task forwards frames from it to the transport. Dropping the
    /// receiver is how a disconnected client is detected on the next tick.
    pub fn add_client(&self, client_id: usize) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.register(client_id);
        let mut clients = self.clients.lock().expect("Broadcaster lock poisoned");
        clients.insert(client_id, tx);
        log::info!("New connection {}. Total active: {}", client_id, clients.len());
        rx
    }

    /// Tear a client down: drop it from the live set and the registry.
    /// Idempotent, so the WebSocket task and the tick loop may race on it.
    pub fn remove_client(&self, client_id: usize) {
        let removed = {
            let mut clients = self.clients.lock().expect("Broadcaster lock poisoned");
            clients.remove(&client_id).is_some()
        };
        self.registry.unregister(client_id);
        if removed {
            let count = self.client_count();
            log::info!("Connection {} closed. Total active: {}", client_id, count);
        }
    }

    /// Number of live connections.
    pub fn client_count(&self) -> usize {
        let clients = self.clients.lock().expect("Broadcaster lock poisoned");
        clients.len()
    }

    /// Deliver one tick's worth of data to every live client.
    ///
    /// Per client: an empty subscription set means no frame at all, and so
    /// does a subscription set whose topics hold no data yet. Otherwise the
    /// frame maps each subscribed topic that has data to its reading, with
    /// the timestamp captured here, per client, at send time.
    pub fn broadcast_tick(&self) {
        // Stable copy of the live set for this tick.
        let live: Vec<(usize, mpsc::UnboundedSender<String>)> = {
            let clients = self.clients.lock().expect("Broadcaster lock poisoned");
            clients.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut dead = Vec::new();
        for (client_id, tx) in live {
            let topics = self.registry.topics_of(client_id);
            if topics.is_empty() {
                continue;
            }

            let snapshot = self.store.snapshot(&topics);
            if snapshot.is_empty() {
                // Subscribed only to topics nothing has produced yet.
                continue;
            }

            let frame: HashMap<String, Reading> = snapshot
                .into_iter()
                .map(|(topic, value)| (topic, Reading::now(value)))
                .collect();

            match serde_json::to_string(&frame) {
                Ok(json) => {
                    if tx.send(json).is_err() {
                        dead.push(client_id);
                    }
                }
                Err(e) => {
                    log::error!("Failed to encode frame for client {}: {}", client_id, e);
                }
            }
        }

        // Teardown after the loop so one dead client never stalls delivery
        // to its siblings within the same tick.
        for client_id in dead {
            log::warn!("Error sending data to client {}. Removing.", client_id);
            self.remove_client(client_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio::sync::mpsc::error::TryRecvError;

    fn topics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn engine() -> (DataStore, SubscriptionRegistry, Broadcaster) {
        let store = DataStore::new();
        let registry = SubscriptionRegistry::new();
        let broadcaster = Broadcaster::new(store.clone(), registry.clone());
        (store, registry, broadcaster)
    }

    fn parse(frame: &str) -> serde_json::Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn add_client_registers_an_empty_subscription_set() {
        let (_store, registry, broadcaster) = engine();
        let _rx = broadcaster.add_client(1);
        assert_eq!(broadcaster.client_count(), 1);
        assert_eq!(registry.client_count(), 1);
        assert!(registry.topics_of(1).is_empty());
    }

    #[tokio::test]
    async fn remove_client_is_idempotent_and_unregisters() {
        let (_store, registry, broadcaster) = engine();
        let _rx = broadcaster.add_client(1);
        broadcaster.remove_client(1);
        broadcaster.remove_client(1);
        assert_eq!(broadcaster.client_count(), 0);
        assert_eq!(registry.client_count(), 0);
    }

    #[tokio::test]
    async fn no_frame_for_empty_subscription_set() {
        let (store, _registry, broadcaster) = engine();
        store.set("STOCK:AAPL", 101.23);
        let mut rx = broadcaster.add_client(1);

        broadcaster.broadcast_tick();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn no_frame_when_subscribed_topics_have_no_data() {
        let (_store, registry, broadcaster) = engine();
        let mut rx = broadcaster.add_client(1);
        registry.subscribe(1, &topics(&["SENSOR:1"]));

        broadcaster.broadcast_tick();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        // The client is still live; it just had nothing to receive.
        assert_eq!(broadcaster.client_count(), 1);
    }

    #[tokio::test]
    async fn frame_contains_exactly_the_topics_with_data() {
        let (store, registry, broadcaster) = engine();
        store.set("STOCK:AAPL", 101.23);
        let mut rx = broadcaster.add_client(1);
        registry.subscribe(1, &topics(&["STOCK:AAPL", "SENSOR:1"]));

        broadcaster.broadcast_tick();

        let frame = parse(&rx.try_recv().unwrap());
        assert_eq!(frame["STOCK:AAPL"]["value"], 101.23);
        assert!(frame["STOCK:AAPL"]["timestamp"].as_f64().unwrap() > 0.0);
        // Never sent as null; simply omitted.
        assert!(frame.get("SENSOR:1").is_none());
    }

    #[tokio::test]
    async fn frame_is_limited_to_the_subscribed_topics() {
        let (store, registry, broadcaster) = engine();
        store.set("STOCK:AAPL", 101.23);
        store.set("STOCK:MSFT", 310.0);
        let mut rx = broadcaster.add_client(1);
        registry.subscribe(1, &topics(&["STOCK:MSFT"]));

        broadcaster.broadcast_tick();

        let frame = parse(&rx.try_recv().unwrap());
        assert_eq!(frame.as_object().unwrap().len(), 1);
        assert_eq!(frame["STOCK:MSFT"]["value"], 310.0);
    }

    #[tokio::test]
    async fn one_write_is_visible_to_all_subscribers_in_the_same_tick() {
        let (store, registry, broadcaster) = engine();
        store.set("STOCK:AAPL", 101.23);
        let mut rx1 = broadcaster.add_client(1);
        let mut rx2 = broadcaster.add_client(2);
        registry.subscribe(1, &topics(&["STOCK:AAPL"]));
        registry.subscribe(2, &topics(&["STOCK:AAPL"]));

        broadcaster.broadcast_tick();

        let f1 = parse(&rx1.try_recv().unwrap());
        let f2 = parse(&rx2.try_recv().unwrap());
        assert_eq!(f1["STOCK:AAPL"]["value"], f2["STOCK:AAPL"]["value"]);
    }

    #[tokio::test]
    async fn dead_client_is_torn_down_without_blocking_siblings() {
        let (store, registry, broadcaster) = engine();
        store.set("STOCK:AAPL", 101.23);

        let rx_dead = broadcaster.add_client(1);
        let mut rx_live = broadcaster.add_client(2);
        registry.subscribe(1, &topics(&["STOCK:AAPL"]));
        registry.subscribe(2, &topics(&["STOCK:AAPL"]));

        // Simulate a transport failure: the forwarding task is gone.
        drop(rx_dead);
        broadcaster.broadcast_tick();

        // The sibling still got its frame in the same tick.
        assert!(rx_live.try_recv().is_ok());
        // The dead client left both the live set and the registry.
        assert_eq!(broadcaster.client_count(), 1);
        assert!(registry.topics_of(1).is_empty());
        assert_eq!(registry.client_count(), 1);
    }

    #[tokio::test]
    async fn torn_down_client_is_not_revisited_on_later_ticks() {
        let (store, registry, broadcaster) = engine();
        store.set("STOCK:AAPL", 101.23);

        let rx = broadcaster.add_client(1);
        registry.subscribe(1, &topics(&["STOCK:AAPL"]));
        drop(rx);

        broadcaster.broadcast_tick();
        assert_eq!(broadcaster.client_count(), 0);

        // Later ticks run cleanly with the client gone.
        broadcaster.broadcast_tick();
        assert_eq!(broadcaster.client_count(), 0);
    }

    #[tokio::test]
    async fn subscription_change_is_visible_on_the_next_tick() {
        let (store, registry, broadcaster) = engine();
        store.set("STOCK:AAPL", 101.23);
        store.set("SENSOR:1", 24.5);

        let mut rx = broadcaster.add_client(1);
        registry.subscribe(1, &topics(&["STOCK:AAPL"]));
        broadcaster.broadcast_tick();
        let first = parse(&rx.try_recv().unwrap());
        assert!(first.get("SENSOR:1").is_none());

        registry.subscribe(1, &topics(&["SENSOR:1"]));
        registry.unsubscribe(1, Some(&topics(&["STOCK:AAPL"])));
        broadcaster.broadcast_tick();
        let second = parse(&rx.try_recv().unwrap());
        assert_eq!(second["SENSOR:1"]["value"], 24.5);
        assert!(second.get("STOCK:AAPL").is_none());
    }

    #[tokio::test]
    async fn unsubscribe_all_stops_the_frames() {
        let (store, registry, broadcaster) = engine();
        store.set("STOCK:AAPL", 101.23);
        let mut rx = broadcaster.add_client(1);
        registry.subscribe(1, &topics(&["STOCK:AAPL"]));

        broadcaster.broadcast_tick();
        assert!(rx.try_recv().is_ok());

        registry.unsubscribe(1, None);
        broadcaster.broadcast_tick();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn topics_of_round_trips_through_the_engine() {
        let (_store, registry, broadcaster) = engine();
        let _rx = broadcaster.add_client(7);
        registry.subscribe(7, &topics(&["A", "B"]));

        let expected: HashSet<String> = topics(&["A", "B"]).into_iter().collect();
        assert_eq!(registry.topics_of(7), expected);
    }
}
