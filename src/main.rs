//! # Anchor Watch
//!
//! Watches a vessel's instrument feed at anchor and raises an alarm when
//! telemetry goes stale or a reading crosses its configured threshold.
//!
//! This binary wires the monitor core to a telemetry source and drives it
//! headlessly: alarms and notices go to the log, and watching is started
//! automatically once the required data is flowing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_subscriber;

use anchor_watch::config::{Config, TransportKind};
use anchor_watch::monitor::{
    run_record_ingest, run_serial_ingest, MonitorCommand, MonitorEvent, MonitorLoop,
};
use anchor_watch::transport::InstrumentSerial;

/// Default configuration file path
const DEFAULT_CONFIG_PATH: &str = "anchor-watch.toml";

/// How often to retry starting the watch until the data allows it
const START_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Main entry point for Anchor Watch
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (falling back to defaults on first run)
///    - Open the telemetry source for the configured transport
///
/// 2. **Main Loop**
///    - The monitor task evaluates alarms every 10ms
///    - The ingest task decodes telemetry and feeds the monitor
///    - This task drains monitor events to the log and keeps retrying
///      watch start until the required data is available
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Mark the close as requested so the dropped transport is not
///      reported as a lost connection
///    - Close the command channel, stopping the monitor task
///
/// # Errors
///
/// Returns error if the configuration is invalid or the serial transport
/// cannot be opened.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Anchor Watch v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;
    info!("Configuration loaded from {}", config_path);

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let (ingest_tx, ingest_rx) = mpsc::channel(64);
    let close_requested = Arc::new(AtomicBool::new(false));

    let (monitor, mut events) = MonitorLoop::new(config.clone(), commands_rx, ingest_rx);
    let monitor_task = tokio::spawn(monitor.run());

    // Telemetry source for the configured transport. The bus transport
    // consumes pre-framed records from stdin, one per line; a broker
    // client can pipe into it.
    let ingest_task = match config.connection.transport {
        TransportKind::Serial => {
            let serial = InstrumentSerial::open(
                &config.connection.serial_port,
                config.connection.baud_rate,
            )?;
            info!("Reading instrument feed from {}", serial.device_path());
            tokio::spawn(run_serial_ingest(
                serial.into_stream(),
                ingest_tx,
                close_requested.clone(),
            ))
        }
        TransportKind::Bus => {
            info!(
                "Reading bus records from stdin (device code {})",
                config.connection.device_code
            );
            let (records_tx, records_rx) = mpsc::channel(64);
            tokio::spawn(read_stdin_records(records_tx));
            tokio::spawn(run_record_ingest(
                records_rx,
                ingest_tx,
                close_requested.clone(),
            ))
        }
    };

    info!("Press Ctrl+C to exit");

    let mut start_retry = interval(START_RETRY_INTERVAL);
    let mut watching = false;

    loop {
        tokio::select! {
            // Keep asking to watch until the data is there
            _ = start_retry.tick(), if !watching => {
                if commands_tx.send(MonitorCommand::StartWatching).await.is_err() {
                    break;
                }
            }

            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    MonitorEvent::ShowMessage(text) => warn!("ALARM: {}", text),
                    MonitorEvent::DismissMessage => info!("Alarm dismissed"),
                    MonitorEvent::StartSound { kind, volume } => {
                        info!("Sound: {:?} at volume {}", kind, volume);
                    }
                    MonitorEvent::StopSound => info!("Sound stopped"),
                    MonitorEvent::Notice(text) => warn!("{}", text),
                    MonitorEvent::SignalStrength(bucket) => {
                        debug!("Signal strength: {}/5", bucket);
                    }
                    MonitorEvent::Summary(snapshot) => {
                        watching = snapshot.state != anchor_watch::alarm::AlarmState::Idle;
                        debug!(
                            "depth={:?} wind={:?} drift={:?} state={:?}",
                            snapshot.depth,
                            snapshot.wind_speed,
                            snapshot.drift_metres,
                            snapshot.state,
                        );
                    }
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                close_requested.store(true, Ordering::SeqCst);
                break;
            }
        }
    }

    // Closing the command channel stops the monitor task
    drop(commands_tx);
    let _ = monitor_task.await;
    ingest_task.abort();

    Ok(())
}

/// Feed stdin lines to the record-ingest task.
async fn read_stdin_records(tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            return;
        }
    }
}
