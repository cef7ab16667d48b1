//! # Alarm Engine
//!
//! Staleness- and threshold-based alarm state machine with rearm cooldown.
//!
//! The engine is ticked on a short fixed period (the driver uses 10 ms;
//! correctness only needs the period to be much shorter than the rearm
//! time). It consumes a telemetry snapshot, the watch configuration and the
//! drift tracker, and talks to the outside world only through the
//! [`AlarmSound`] and [`Presenter`] sink traits. At most one alarm is
//! presented at a time; further checks are suppressed until it is
//! acknowledged.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::WatchConfig;
use crate::drift::DriftTracker;
use crate::error::{AnchorWatchError, Result};
use crate::telemetry::{Channel, TelemetryStore};

/// Minimum cooldown between consecutive alarm raises, regardless of
/// acknowledgement.
pub const ALARM_REARM_TIME: Duration = Duration::from_secs(30);

/// Minimum interval between watch ping sounds.
pub const PING_INTERVAL: Duration = Duration::from_secs(10);

/// Volume for the sustained alarm sound.
pub const SUSTAINED_VOLUME: f32 = 1.0;

/// Volume for the periodic watch ping.
pub const PING_VOLUME: f32 = 0.2;

/// Kind of sound the alarm sink is asked to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    /// Looping alarm tone, stopped only by acknowledge/stop.
    Sustained,
    /// Short one-shot confidence ping.
    Ping,
}

/// Audible alarm sink.
pub trait AlarmSound {
    fn start_sound(&mut self, kind: SoundKind, volume: f32);
    fn stop_sound(&mut self);
}

/// Message presentation sink (dialog, notification, console).
pub trait Presenter {
    fn show_message(&mut self, text: &str);
    fn dismiss(&mut self);
    fn is_shown(&self) -> bool;
}

/// Externally visible alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Idle,
    Watching,
    DataLossAlarm,
    ThresholdAlarm,
}

/// Wrap a raw heading delta that exceeds plus or minus 180 degrees.
///
/// Deliberately subtracts/adds 180 rather than 360, matching prior
/// behavior exactly. For deltas beyond 360 this does NOT land in
/// [-180, 180]; see DESIGN.md before "fixing" it.
pub fn heading_change_degrees(current: f32, start: f32) -> f32 {
    let mut change = current - start;
    if change > 180.0 {
        change -= 180.0;
    }
    if change < -180.0 {
        change += 180.0;
    }
    change
}

/// The staleness/threshold alarm state machine.
#[derive(Debug, Default)]
pub struct AlarmEngine {
    watching: bool,
    data_loss_active: bool,
    /// Which staleness message is currently presented; dismissal is keyed
    /// to the group that raised it.
    data_loss_message: Option<&'static str>,
    threshold_active: bool,
    ping_enabled: bool,
    /// Heading at watch start, captured whenever heading watching is
    /// enabled, with or without a position fix.
    start_heading: Option<f32>,
    /// Pressure at watch start, captured like the heading.
    start_pressure: Option<f32>,
    last_alarm_time: Option<Instant>,
    last_ping_time: Option<Instant>,
}

impl AlarmEngine {
    pub fn new(ping_enabled: bool) -> Self {
        Self {
            ping_enabled,
            ..Self::default()
        }
    }

    pub fn set_ping_enabled(&mut self, enabled: bool) {
        self.ping_enabled = enabled;
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }

    /// Heading captured at watch start, when heading watching is enabled.
    pub fn start_heading(&self) -> Option<f32> {
        self.start_heading
    }

    /// Pressure captured at watch start, when pressure watching is enabled.
    pub fn start_pressure(&self) -> Option<f32> {
        self.start_pressure
    }

    pub fn state(&self) -> AlarmState {
        if !self.watching {
            AlarmState::Idle
        } else if self.data_loss_active {
            AlarmState::DataLossAlarm
        } else if self.threshold_active {
            AlarmState::ThresholdAlarm
        } else {
            AlarmState::Watching
        }
    }

    /// Begin watching.
    ///
    /// Validates the configuration and data freshness, then captures the
    /// anchor reference for the change-from-start channels and clears the
    /// drift trail. On rejection the engine stays `Idle` and the error
    /// carries the user-visible message.
    pub fn start_watching(
        &mut self,
        now: Instant,
        store: &TelemetryStore,
        config: &WatchConfig,
        drift: &mut DriftTracker,
    ) -> Result<()> {
        if config.depth_watching && config.depth_min >= config.depth_max {
            return Err(AnchorWatchError::Watch(
                "Minimum depth must be less than maximum depth.".to_string(),
            ));
        }
        if !config.any_enabled() {
            return Err(AnchorWatchError::Watch(
                "No measurements chosen to watch.".to_string(),
            ));
        }
        if !Self::all_required_data_fresh(now, store, config) {
            return Err(AnchorWatchError::Watch(
                "Not all required data available to start watching.".to_string(),
            ));
        }

        // Start values for the change-from-start channels. Heading and
        // pressure are captured independently of any position fix; the
        // anchor position only feeds the drift trail and position check.
        self.start_heading = config
            .heading_change_watching
            .then(|| store.value(Channel::Heading))
            .flatten();
        self.start_pressure = config
            .pressure_change_watching
            .then(|| store.value(Channel::Pressure))
            .flatten();

        if let (Some(latitude), Some(longitude)) = (
            store.value(Channel::Latitude),
            store.value(Channel::Longitude),
        ) {
            drift.set_reference(latitude, longitude);
        } else {
            drift.clear_trail();
        }

        self.watching = true;
        self.data_loss_active = false;
        self.data_loss_message = None;
        self.threshold_active = false;
        info!("watching started");
        Ok(())
    }

    /// Stop watching, synchronously clearing every alarm flag and silencing
    /// any sound in progress. No alarm state survives a stop.
    pub fn stop_watching(&mut self, sound: &mut dyn AlarmSound, presenter: &mut dyn Presenter) {
        self.watching = false;
        self.data_loss_active = false;
        self.data_loss_message = None;
        self.threshold_active = false;
        self.start_heading = None;
        self.start_pressure = None;
        sound.stop_sound();
        if presenter.is_shown() {
            presenter.dismiss();
        }
        info!("watching stopped");
    }

    /// Acknowledge the currently presented alarm.
    ///
    /// Stops the sound and clears both raise flags, but does NOT reset the
    /// cooldown: no new alarm fires until the rearm time has elapsed from
    /// the original raise.
    pub fn acknowledge(&mut self, sound: &mut dyn AlarmSound) {
        sound.stop_sound();
        self.data_loss_active = false;
        self.data_loss_message = None;
        self.threshold_active = false;
        debug!("alarm acknowledged");
    }

    /// Transport connection unexpectedly lost.
    ///
    /// Watching cannot continue without data: stop it and, if we were
    /// watching, raise a data-loss-style alarm.
    pub fn connection_lost(&mut self, sound: &mut dyn AlarmSound, presenter: &mut dyn Presenter) {
        let was_watching = self.watching;
        self.watching = false;
        self.data_loss_active = false;
        self.data_loss_message = None;
        self.threshold_active = false;
        if was_watching {
            sound.start_sound(SoundKind::Sustained, SUSTAINED_VOLUME);
        }
        presenter.show_message("Connection lost.");
    }

    /// One engine tick. Evaluates ping, staleness and threshold rules in
    /// that order; only meaningful while watching.
    pub fn tick(
        &mut self,
        now: Instant,
        store: &TelemetryStore,
        config: &WatchConfig,
        drift: &DriftTracker,
        sound: &mut dyn AlarmSound,
        presenter: &mut dyn Presenter,
    ) {
        if !self.watching {
            return;
        }

        self.tick_ping(now, sound);
        self.check_staleness(now, store, config, sound, presenter);
        self.check_thresholds(now, store, config, drift, sound, presenter);
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.last_alarm_time {
            Some(t) => now.duration_since(t) > ALARM_REARM_TIME,
            None => true,
        }
    }

    fn tick_ping(&mut self, now: Instant, sound: &mut dyn AlarmSound) {
        if !self.ping_enabled || self.data_loss_active || self.threshold_active {
            return;
        }
        let due = match self.last_ping_time {
            Some(t) => now.duration_since(t) > PING_INTERVAL,
            None => true,
        };
        if due {
            sound.start_sound(SoundKind::Ping, PING_VOLUME);
            self.last_ping_time = Some(now);
        }
    }

    /// Staleness rule: for each enabled channel group, raise "No <x> data
    /// received" when its data ages out; if the alert is up and the data is
    /// fresh again, silence and dismiss it.
    fn check_staleness(
        &mut self,
        now: Instant,
        store: &TelemetryStore,
        config: &WatchConfig,
        sound: &mut dyn AlarmSound,
        presenter: &mut dyn Presenter,
    ) {
        if !self.cooldown_elapsed(now) || self.threshold_active {
            return;
        }

        let mut raised = false;
        for (enabled, channels, message) in Self::staleness_checks(config) {
            if !enabled {
                continue;
            }
            let stale = channels.iter().any(|&c| !store.is_fresh(c, now));
            if stale {
                if !presenter.is_shown() {
                    info!("data loss: {}", message);
                    presenter.show_message(message);
                    self.data_loss_active = true;
                    self.data_loss_message = Some(message);
                    raised = true;
                }
            } else if self.data_loss_active && self.data_loss_message == Some(message) {
                // The group that raised the alert is fresh again: silence
                // and dismiss without waiting for an acknowledgement
                sound.stop_sound();
                presenter.dismiss();
                self.data_loss_active = false;
                self.data_loss_message = None;
            }
        }

        if raised {
            sound.start_sound(SoundKind::Sustained, SUSTAINED_VOLUME);
            self.last_alarm_time = Some(now);
        }
    }

    /// Threshold rule: compare current (or derived change-from-start)
    /// values against their configured bounds.
    fn check_thresholds(
        &mut self,
        now: Instant,
        store: &TelemetryStore,
        config: &WatchConfig,
        drift: &DriftTracker,
        sound: &mut dyn AlarmSound,
        presenter: &mut dyn Presenter,
    ) {
        if !self.cooldown_elapsed(now) || self.data_loss_active || self.threshold_active {
            return;
        }

        let mut raised = false;
        let mut breach = |breached: bool, message: &str, engine: &mut Self| {
            if breached {
                engine.last_alarm_time = Some(now);
                if !presenter.is_shown() {
                    info!("threshold breach: {}", message);
                    presenter.show_message(message);
                    engine.threshold_active = true;
                    raised = true;
                }
            }
        };

        if config.depth_watching {
            if let Some(depth) = store.value(Channel::Depth) {
                breach(
                    depth < config.depth_min || depth > config.depth_max,
                    "Depth alarm",
                    self,
                );
            }
        }

        if config.wind_watching {
            if let Some(wind) = store.value(Channel::WindSpeed) {
                breach(wind > config.wind_max, "Wind alarm", self);
            }
        }

        if config.heading_change_watching {
            if let (Some(heading), Some(start)) =
                (store.value(Channel::Heading), self.start_heading)
            {
                let change = heading_change_degrees(heading, start);
                breach(
                    change.abs() > config.heading_change_max,
                    "Heading change alarm",
                    self,
                );
            }
        }

        if config.pressure_change_watching {
            if let (Some(pressure), Some(start)) =
                (store.value(Channel::Pressure), self.start_pressure)
            {
                breach(
                    (pressure - start).abs() > config.pressure_change_max,
                    "Pressure change alarm",
                    self,
                );
            }
        }

        if config.sog_watching {
            if let Some(sog) = store.value(Channel::SpeedOverGround) {
                breach(sog > config.sog_max, "SOG alarm", self);
            }
        }

        if config.position_change_watching {
            if let (Some(latitude), Some(longitude)) = (
                store.value(Channel::Latitude),
                store.value(Channel::Longitude),
            ) {
                if let Some(distance) = drift.distance_from_reference(latitude, longitude) {
                    breach(
                        distance > config.position_change_max,
                        "Position change alarm",
                        self,
                    );
                }
            }
        }

        if raised {
            sound.start_sound(SoundKind::Sustained, SUSTAINED_VOLUME);
            self.last_alarm_time = Some(now);
        }
    }

    fn all_required_data_fresh(now: Instant, store: &TelemetryStore, config: &WatchConfig) -> bool {
        Self::staleness_checks(config)
            .into_iter()
            .all(|(enabled, channels, _)| {
                !enabled || channels.iter().all(|&c| store.is_fresh(c, now))
            })
    }

    /// Per-watch-group staleness table: enable flag, required channels and
    /// the data-loss message.
    fn staleness_checks(config: &WatchConfig) -> [(bool, &'static [Channel], &'static str); 6] {
        [
            (
                config.depth_watching,
                &[Channel::Depth],
                "No depth data received",
            ),
            (
                config.wind_watching,
                &[Channel::WindSpeed],
                "No windspeed data received",
            ),
            (
                config.heading_change_watching,
                &[Channel::Heading],
                "No heading data received",
            ),
            (
                config.pressure_change_watching,
                &[Channel::Pressure],
                "No pressure data received",
            ),
            (
                config.sog_watching,
                &[Channel::SpeedOverGround],
                "No SOG data received",
            ),
            (
                config.position_change_watching,
                &[Channel::Latitude, Channel::Longitude],
                "No position data received",
            ),
        ]
    }
}
