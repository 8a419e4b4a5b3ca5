use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;

mod feed_logic;
use feed_logic::{config, downstream, logger, state};
use lib_common::core::{producer, Broadcaster, DataStore, SubscriptionRegistry, SyntheticProducer};

#[tokio::main]
async fn main() -> Result<()> {
    // Explicitly install the default crypto provider for rustls
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();

    let settings = config::load_config();
    logger::setup_logging(&settings.log_dir, &settings.log_level)?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    // The shared engine: value store, subscription registry, broadcaster.
    let store = DataStore::new();
    let registry = SubscriptionRegistry::new();
    let broadcaster = Arc::new(Broadcaster::new(store.clone(), registry.clone()));
    let app_state = state::AppState::new(store.clone(), registry, Arc::clone(&broadcaster));

    let feed_producer = SyntheticProducer::new(settings.stock_tickers.clone(), settings.sensor_count);
    let producer_handle = tokio::spawn(producer::run(
        feed_producer,
        store,
        broadcaster,
        Duration::from_millis(settings.tick_interval_ms),
        shutdown_tx.subscribe(),
    ));

    let downstream_handle = tokio::spawn(downstream::run(
        settings,
        app_state,
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut term_signal = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    // Wait for components to shut down
    let _ = tokio::try_join!(producer_handle, downstream_handle);

    log::info!("Shutdown complete.");
    Ok(())
}
