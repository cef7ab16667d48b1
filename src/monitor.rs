//! # Monitor Module
//!
//! Owns the live state (telemetry store, drift tracker, alarm engine) and
//! drives it from three inputs: decoded telemetry from an ingest task, user
//! commands, and a fixed-period tick.
//!
//! The monitor never touches a device or a screen directly. Ingest tasks
//! feed it [`IngestEvent`]s; everything it wants the outside world to do
//! comes back out as [`MonitorEvent`]s. This keeps the whole loop testable
//! without hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::alarm::{
    heading_change_degrees, AlarmEngine, AlarmSound, AlarmState, Presenter, SoundKind,
};
use crate::config::Config;
use crate::drift::DriftTracker;
use crate::nmea::decoder::decode_sentence;
use crate::nmea::framer::SentenceFramer;
use crate::nmea::record::decode_record;
use crate::telemetry::{Channel, ChannelUpdate, TelemetryStore};

/// Alarm evaluation period.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Derived-value summary period.
pub const SUMMARY_INTERVAL: Duration = Duration::from_secs(1);

/// Serial read chunk size.
const READ_BUFFER_SIZE: usize = 256;

/// User commands into the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    StartWatching,
    StopWatching,
    Acknowledge,
    ResetTrail,
}

/// Decoded input from an ingest task.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    Updates(Vec<ChannelUpdate>),
    /// Link signal-strength bucket (bus transport only).
    Signal(u8),
    /// The transport dropped without a requested close.
    ConnectionLost,
}

/// Once-a-second state snapshot for display and logging.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    pub depth: Option<f32>,
    pub pressure: Option<f32>,
    pub heading: Option<f32>,
    pub wind_speed: Option<f32>,
    pub speed_over_ground: Option<f32>,
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    /// Wrapped degrees moved from the heading captured at watch start;
    /// `None` while not watching or when the heading is stale.
    pub heading_change: Option<f32>,
    /// Millibars moved from the pressure captured at watch start.
    pub pressure_change: Option<f32>,
    /// Metres from the anchor reference, when watching with a fix.
    pub drift_metres: Option<f32>,
    pub trail_len: usize,
    pub state: AlarmState,
}

/// Everything the monitor wants done outside itself.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Present the alarm message until dismissed.
    ShowMessage(String),
    DismissMessage,
    StartSound { kind: SoundKind, volume: f32 },
    StopSound,
    /// Transient notice, e.g. a watch-start refusal.
    Notice(String),
    SignalStrength(u8),
    Summary(SummarySnapshot),
}

/// [`Presenter`] that forwards to the event channel, tracking shown state.
#[derive(Debug)]
pub struct EventPresenter {
    tx: mpsc::UnboundedSender<MonitorEvent>,
    shown: bool,
}

impl EventPresenter {
    pub fn new(tx: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        Self { tx, shown: false }
    }
}

impl Presenter for EventPresenter {
    fn show_message(&mut self, text: &str) {
        // A closed receiver only means we are shutting down
        let _ = self.tx.send(MonitorEvent::ShowMessage(text.to_string()));
        self.shown = true;
    }

    fn dismiss(&mut self) {
        let _ = self.tx.send(MonitorEvent::DismissMessage);
        self.shown = false;
    }

    fn is_shown(&self) -> bool {
        self.shown
    }
}

/// [`AlarmSound`] that forwards to the event channel.
#[derive(Debug)]
pub struct EventSounder {
    tx: mpsc::UnboundedSender<MonitorEvent>,
}

impl EventSounder {
    pub fn new(tx: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        Self { tx }
    }
}

impl AlarmSound for EventSounder {
    fn start_sound(&mut self, kind: SoundKind, volume: f32) {
        let _ = self.tx.send(MonitorEvent::StartSound { kind, volume });
    }

    fn stop_sound(&mut self) {
        let _ = self.tx.send(MonitorEvent::StopSound);
    }
}

/// The monitor loop state.
pub struct MonitorLoop {
    config: Config,
    store: TelemetryStore,
    drift: DriftTracker,
    engine: AlarmEngine,
    sounder: EventSounder,
    presenter: EventPresenter,
    events: mpsc::UnboundedSender<MonitorEvent>,
    commands: mpsc::Receiver<MonitorCommand>,
    ingest: mpsc::Receiver<IngestEvent>,
}

impl MonitorLoop {
    /// Build a monitor and the receiving end of its event channel.
    pub fn new(
        config: Config,
        commands: mpsc::Receiver<MonitorCommand>,
        ingest: mpsc::Receiver<IngestEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let engine = AlarmEngine::new(config.connection.ping_enabled);
        let monitor = Self {
            config,
            store: TelemetryStore::new(),
            drift: DriftTracker::new(),
            engine,
            sounder: EventSounder::new(events.clone()),
            presenter: EventPresenter::new(events.clone()),
            events,
            commands,
            ingest,
        };
        (monitor, events_rx)
    }

    /// Run until the command channel closes.
    pub async fn run(mut self) {
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut summary = tokio::time::interval(SUMMARY_INTERVAL);
        summary.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut ingest_open = true;

        info!("Monitor loop started");
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.tick_once(Instant::now());
                }

                _ = summary.tick() => {
                    self.emit_summary(Instant::now());
                }

                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command, Instant::now()),
                        None => {
                            info!("Command channel closed, monitor loop exiting");
                            break;
                        }
                    }
                }

                event = self.ingest.recv(), if ingest_open => {
                    match event {
                        Some(event) => self.handle_ingest(event, Instant::now()),
                        None => ingest_open = false,
                    }
                }
            }
        }
    }

    /// One alarm-evaluation tick.
    fn tick_once(&mut self, now: Instant) {
        self.engine.tick(
            now,
            &self.store,
            &self.config.watch,
            &self.drift,
            &mut self.sounder,
            &mut self.presenter,
        );

        // Extend the drift trail while watching with a fresh fix
        if self.engine.is_watching() {
            if let (Some(latitude), Some(longitude)) = (
                self.store.fresh_value(Channel::Latitude, now),
                self.store.fresh_value(Channel::Longitude, now),
            ) {
                self.drift.record_if_due(now, latitude, longitude);
            }
        }
    }

    fn handle_command(&mut self, command: MonitorCommand, now: Instant) {
        debug!("Command: {:?}", command);
        match command {
            MonitorCommand::StartWatching => {
                let result =
                    self.engine
                        .start_watching(now, &self.store, &self.config.watch, &mut self.drift);
                if let Err(e) = result {
                    let _ = self.events.send(MonitorEvent::Notice(e.to_string()));
                }
            }
            MonitorCommand::StopWatching => {
                self.engine
                    .stop_watching(&mut self.sounder, &mut self.presenter);
            }
            MonitorCommand::Acknowledge => {
                self.engine.acknowledge(&mut self.sounder);
                if self.presenter.is_shown() {
                    self.presenter.dismiss();
                }
            }
            MonitorCommand::ResetTrail => {
                self.drift.clear_trail();
            }
        }
    }

    fn handle_ingest(&mut self, event: IngestEvent, now: Instant) {
        match event {
            IngestEvent::Updates(updates) => {
                for update in &updates {
                    trace!("{} = {}", update.channel.name(), update.value);
                }
                self.store.apply(&updates, now);
            }
            IngestEvent::Signal(bucket) => {
                let _ = self.events.send(MonitorEvent::SignalStrength(bucket));
            }
            IngestEvent::ConnectionLost => {
                warn!("Telemetry connection lost");
                self.engine
                    .connection_lost(&mut self.sounder, &mut self.presenter);
                self.store.clear();
            }
        }
    }

    fn emit_summary(&mut self, now: Instant) {
        let heading_change = match (
            self.store.fresh_value(Channel::Heading, now),
            self.engine.start_heading(),
        ) {
            (Some(current), Some(start)) => Some(heading_change_degrees(current, start)),
            _ => None,
        };
        let pressure_change = match (
            self.store.fresh_value(Channel::Pressure, now),
            self.engine.start_pressure(),
        ) {
            (Some(current), Some(start)) => Some(current - start),
            _ => None,
        };
        let drift_metres = match (
            self.store.fresh_value(Channel::Latitude, now),
            self.store.fresh_value(Channel::Longitude, now),
        ) {
            (Some(latitude), Some(longitude)) => {
                self.drift.distance_from_reference(latitude, longitude)
            }
            _ => None,
        };

        let snapshot = SummarySnapshot {
            depth: self.store.fresh_value(Channel::Depth, now),
            pressure: self.store.fresh_value(Channel::Pressure, now),
            heading: self.store.fresh_value(Channel::Heading, now),
            wind_speed: self.store.fresh_value(Channel::WindSpeed, now),
            speed_over_ground: self.store.fresh_value(Channel::SpeedOverGround, now),
            latitude: self.store.fresh_value(Channel::Latitude, now),
            longitude: self.store.fresh_value(Channel::Longitude, now),
            heading_change,
            pressure_change,
            drift_metres,
            trail_len: self.drift.len(),
            state: self.engine.state(),
        };
        debug!(
            "Summary: state={:?} depth={:?} drift={:?}",
            snapshot.state, snapshot.depth, snapshot.drift_metres
        );
        let _ = self.events.send(MonitorEvent::Summary(snapshot));
    }
}

/// Read a raw byte stream, frame and decode sentences, and feed the monitor.
///
/// Runs until EOF or a read error. When the stream ends without a requested
/// close, reports [`IngestEvent::ConnectionLost`] exactly once; a requested
/// close (flag set before the stream drops) ends the task silently.
pub async fn run_serial_ingest<R>(
    mut reader: R,
    tx: mpsc::Sender<IngestEvent>,
    close_requested: Arc<AtomicBool>,
) where
    R: AsyncRead + Unpin,
{
    let mut framer = SentenceFramer::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("Serial stream ended");
                break;
            }
            Ok(n) => {
                for sentence in framer.push_bytes(&buf[..n]) {
                    let updates = decode_sentence(&sentence);
                    if updates.is_empty() {
                        continue;
                    }
                    if tx.send(IngestEvent::Updates(updates)).await.is_err() {
                        // Monitor gone, nothing left to feed
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("Serial read failed: {}", e);
                break;
            }
        }
    }

    if !close_requested.load(Ordering::SeqCst) {
        let _ = tx.send(IngestEvent::ConnectionLost).await;
    }
}

/// Decode pre-framed message-bus records and feed the monitor.
///
/// Each record also carries link signal strength, reported separately so
/// the display can show reception quality.
pub async fn run_record_ingest(
    mut records: mpsc::Receiver<String>,
    tx: mpsc::Sender<IngestEvent>,
    close_requested: Arc<AtomicBool>,
) {
    while let Some(payload) = records.recv().await {
        let decoded = decode_record(&payload);
        if tx
            .send(IngestEvent::Signal(decoded.signal_bucket))
            .await
            .is_err()
        {
            return;
        }
        if !decoded.updates.is_empty()
            && tx.send(IngestEvent::Updates(decoded.updates)).await.is_err()
        {
            return;
        }
    }

    if !close_requested.load(Ordering::SeqCst) {
        let _ = tx.send(IngestEvent::ConnectionLost).await;
    }
}
