//! Manual subscription client for a running feed server.
//!
//! Connects to the WebSocket endpoint, subscribes to the given topics, and
//! reports per-topic frame counts at a fixed interval. Useful for eyeballing
//! broadcast behaviour end to end; the automated coverage lives in the
//! `lib_common` and `servers` unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the feed server
    #[clap(long, default_value = "ws://127.0.0.1:8000/ws")]
    url: String,

    /// Topics to subscribe to
    #[clap(long, value_delimiter = ',', default_value = "STOCK:AAPL,STOCK:MSFT,SENSOR:1")]
    topics: Vec<String>,

    /// Report interval in seconds
    #[clap(short, long, default_value_t = 10)]
    report_interval_secs: u64,
}

#[derive(Default)]
struct Stats {
    frames: u64,
    per_topic: HashMap<String, u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (ws_stream, _) = connect_async(args.url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", args.url))?;
    println!("[{}] Connected to {}", Utc::now().format("%H:%M:%S"), args.url);

    let (mut write, mut read) = ws_stream.split();

    let subscribe = json!({ "command": "subscribe", "topics": args.topics }).to_string();
    write.send(Message::Text(subscribe.into())).await?;

    let stats = Arc::new(Mutex::new(Stats::default()));

    // Reporter task
    let stats_reporter = Arc::clone(&stats);
    let report_interval = args.report_interval_secs;
    tokio::spawn(async move {
        loop {
            sleep(std::time::Duration::from_secs(report_interval)).await;
            let mut data = stats_reporter.lock().unwrap();

            let mut rates: Vec<(String, u64)> = data.per_topic.drain().collect();
            rates.sort_by(|a, b| b.1.cmp(&a.1));
            let total = data.frames;
            data.frames = 0;

            println!(
                "[{}] {} frames in the last {}s",
                Utc::now().format("%H:%M:%S"),
                total,
                report_interval
            );
            for (topic, count) in rates {
                println!("    {topic}: {count}");
            }
        }
    });

    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => {
                let parsed: serde_json::Value = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(_) => continue,
                };

                // Acknowledgments and errors are printed as-is; broadcast
                // frames are counted per topic.
                if parsed.get("status").is_some() || parsed.get("error").is_some() {
                    println!("[{}] {}", Utc::now().format("%H:%M:%S"), text);
                    continue;
                }

                if let Some(frame) = parsed.as_object() {
                    let mut data = stats.lock().unwrap();
                    data.frames += 1;
                    for topic in frame.keys() {
                        *data.per_topic.entry(topic.clone()).or_insert(0) += 1;
                    }
                }
            }
            Message::Close(_) => {
                println!("Server closed the connection.");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
