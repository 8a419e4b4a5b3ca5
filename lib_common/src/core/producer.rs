//! # Tick Producer
//!
//! The engine does not care where values come from; it only requires that
//! something writes into the [`DataStore`] on a schedule and then lets the
//! broadcaster run. That contract is the [`TickProducer`] trait, and
//! [`run`] is the fixed-period loop that drives it.
//!
//! The bundled [`SyntheticProducer`] simulates a small market feed: a
//! random walk over a handful of stock tickers plus uniform-noise sensor
//! readings, both rounded to two decimals.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::broadcast::Broadcaster;
use crate::core::store::DataStore;

/// Anything that refreshes the store once per tick.
pub trait TickProducer: Send {
    fn produce(&mut self, store: &DataStore);
}

/// Synthetic market data: `STOCK:<ticker>` prices performing a ±1% random
/// walk from 100, and `SENSOR:<n>` readings drawn uniformly from 20..30.
pub struct SyntheticProducer {
    stock_tickers: Vec<String>,
    sensor_count: u32,
}

impl SyntheticProducer {
    pub fn new(stock_tickers: Vec<String>, sensor_count: u32) -> Self {
        Self {
            stock_tickers,
            sensor_count,
        }
    }
}

impl Default for SyntheticProducer {
    fn default() -> Self {
        Self::new(
            ["MSFT", "AAPL", "GOOG", "AMZN"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            4,
        )
    }
}

impl TickProducer for SyntheticProducer {
    fn produce(&mut self, store: &DataStore) {
        let mut rng = rand::rng();

        for ticker in &self.stock_tickers {
            let key = format!("STOCK:{ticker}");
            let current = store.get(&key).unwrap_or(100.0);
            let drift: f64 = rng.random_range(-0.01..=0.01);
            store.set(&key, round2(current * (1.0 + drift)));
        }

        for sensor_id in 1..=self.sensor_count {
            let key = format!("SENSOR:{sensor_id}");
            store.set(&key, round2(rng.random_range(20.0..30.0)));
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Drive `producer` and `broadcaster` on a fixed period until shutdown.
///
/// Each iteration fully completes (produce, then broadcast to every live
/// client) before the next one starts, so back-to-back ticks can never
/// overlap and a tick that runs long simply delays its successor.
pub async fn run(
    mut producer: impl TickProducer,
    store: DataStore,
    broadcaster: Arc<Broadcaster>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Tick producer received shutdown signal.");
                break;
            }
            _ = tick.tick() => {
                producer.produce(&store);
                broadcaster.broadcast_tick();
            }
        }
    }
}
