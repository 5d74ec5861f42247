#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]

//! Terminal telemetry monitor: connects to a vehicle and logs state.

use anyhow::Result;
use clap::Parser;
use gcslink::log_history::LogHistory;
use gcslink::{LinkConfig, TelemetryClient, TelemetryEvents, TelemetrySnapshot};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Vehicle host (overrides the config file)
    #[arg(long, default_value = "192.168.144.11")]
    host: String,

    /// Vehicle MAVLink TCP port (overrides the config file)
    #[arg(long, default_value_t = 5760)]
    port: u16,
}

/// Routes client callbacks into tracing output and the recent-lines ring.
struct ConsoleEvents {
    history: Arc<LogHistory>,
}

impl TelemetryEvents for ConsoleEvents {
    fn on_state_update(&self, snapshot: &TelemetrySnapshot) {
        debug!(
            mode = snapshot.mode.as_deref().unwrap_or("--"),
            armed = ?snapshot.armed,
            battery = ?snapshot.battery_percent,
            "state update"
        );
    }

    fn on_log_line(&self, line: &str) {
        info!("{}", line);
        self.history.add(line);
    }

    fn on_connection_state(&self, connected: bool) {
        if connected {
            info!("vehicle link up");
        } else {
            warn!("vehicle link down");
        }
    }
}

fn summarize(snapshot: &TelemetrySnapshot) -> String {
    let mode = snapshot.mode.as_deref().unwrap_or("--");
    let armed = match snapshot.armed {
        Some(true) => "armed",
        Some(false) => "disarmed",
        None => "--",
    };
    let battery = snapshot
        .battery_percent
        .map(|p| format!("{p:.0}%"))
        .unwrap_or_else(|| "--".to_string());
    let position = match (snapshot.lat, snapshot.lon) {
        (Some(lat), Some(lon)) => format!("{lat:.6},{lon:.6}"),
        _ => "--".to_string(),
    };
    format!(
        "connected={} mode={} {} battery={} pos={} sats={:?}",
        snapshot.connected, mode, armed, battery, position, snapshot.satellites
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LinkConfig::load(path).await?,
        None => LinkConfig::new(args.host.clone(), args.port),
    };

    info!("starting telemetry monitor for {}", config.addr());

    let history = Arc::new(LogHistory::default());
    let client = TelemetryClient::new(
        config,
        Arc::new(ConsoleEvents {
            history: history.clone(),
        }),
    );
    client.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(5)) => {
                info!("{}", summarize(&client.latest()));
            }
        }
    }

    client.stop().await;
    info!("shutdown complete");

    Ok(())
}
