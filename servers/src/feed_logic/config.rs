use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Layered configuration: every field is optional so the same struct can be
/// parsed from the CLI/environment (clap) and from the JSON config file
/// (serde), then merged in precedence order.
#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Real-time feed distribution server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "FEED_PORT", help = "Port to listen on for client connections.")]
    pub port: Option<u16>,

    #[clap(long, env = "FEED_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "FEED_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "FEED_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "FEED_TICK_INTERVAL_MS", help = "Milliseconds between producer ticks.")]
    pub tick_interval_ms: Option<u64>,

    #[clap(long, env = "FEED_STOCK_TICKERS", value_delimiter = ',', help = "Comma-separated stock tickers for the synthetic producer.")]
    pub stock_tickers: Option<Vec<String>>,

    #[clap(long, env = "FEED_SENSOR_COUNT", help = "Number of synthetic sensors (SENSOR:1..N).")]
    pub sensor_count: Option<u32>,

    #[clap(long, env = "TLS_CERT_PATH", help = "Path to the TLS certificate file.")]
    pub tls_cert_path: Option<PathBuf>,

    #[clap(long, env = "TLS_KEY_PATH", help = "Path to the TLS private key file.")]
    pub tls_key_path: Option<PathBuf>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            tick_interval_ms: other.tick_interval_ms.or(self.tick_interval_ms),
            stock_tickers: other.stock_tickers.or(self.stock_tickers),
            sensor_count: other.sensor_count.or(self.sensor_count),
            tls_cert_path: other.tls_cert_path.or(self.tls_cert_path),
            tls_key_path: other.tls_key_path.or(self.tls_key_path),
        }
    }

    /// Collapse the merged layers into plain runtime settings.
    fn resolve(self) -> Settings {
        Settings {
            port: self.port.unwrap_or(8000),
            log_dir: self.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: self.log_level.unwrap_or_else(|| "info".to_string()),
            tick_interval_ms: self.tick_interval_ms.unwrap_or(1000),
            stock_tickers: self.stock_tickers.unwrap_or_else(|| {
                ["MSFT", "AAPL", "GOOG", "AMZN"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
            sensor_count: self.sensor_count.unwrap_or(4),
            tls_cert_path: self.tls_cert_path,
            tls_key_path: self.tls_key_path,
        }
    }
}

/// Fully resolved runtime settings, produced by [`load_config`] once all
/// layers are merged. Unlike [`Config`], nothing here is optional except
/// the TLS paths, whose absence means plain TCP.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub tick_interval_ms: u64,
    pub stock_tickers: Vec<String>,
    pub sensor_count: u32,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

pub fn load_config() -> Settings {
    // 1. Parse CLI early to get a potential config file path override.
    let cli_args = Config::parse();

    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("server_feed.conf"));

    let mut current_config = Config::default();

    // 2. Load from the config file if present.
    if config_file_path.exists() {
        if let Ok(config_str) = fs::read_to_string(&config_file_path) {
            if let Ok(file_config) = serde_json::from_str::<Config>(&config_str) {
                current_config = current_config.merge(file_config);
            } else {
                log::warn!(
                    "Failed to parse config file: {}. Falling back to other sources.",
                    config_file_path.display()
                );
            }
        } else {
            log::warn!(
                "Failed to read config file: {}. Falling back to other sources.",
                config_file_path.display()
            );
        }
    }

    // 3. Override with environment variables and CLI arguments; clap handles
    //    both, so merging the parsed args on top covers them together.
    current_config = current_config.merge(cli_args);

    // 4. Apply default TLS paths if not already set. The downstream server
    //    falls back to plain TCP when the files do not exist.
    if current_config.tls_cert_path.is_none() || current_config.tls_key_path.is_none() {
        if let Some(home_dir) = dirs::home_dir() {
            let letsencrypt_dir = home_dir.join(".letsencrypt");
            if current_config.tls_cert_path.is_none() {
                current_config.tls_cert_path = Some(letsencrypt_dir.join("fullchain.pem"));
            }
            if current_config.tls_key_path.is_none() {
                current_config.tls_key_path = Some(letsencrypt_dir.join("privkey.pem"));
            }
        }
    }

    current_config.resolve()
}
