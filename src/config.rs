//! # Configuration Module
//!
//! Handles loading, validating and persisting configuration from TOML files.
//!
//! Watch thresholds are user-adjustable at runtime, so unlike the connection
//! section they are written back to disk with [`Config::save`] whenever the
//! user changes them.

use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

/// How telemetry reaches this process.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Raw byte stream from a serial port, framed into sentences.
    Serial,
    /// Pre-framed records delivered by a message-bus subscription.
    Bus,
}

/// Transport configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionConfig {
    #[serde(default = "default_transport")]
    pub transport: TransportKind,

    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_broker_host")]
    pub broker_host: String,

    #[serde(default = "default_broker_port")]
    pub broker_port: u16,

    /// Hex device code identifying the boat unit; forms the bus topic.
    #[serde(default = "default_device_code")]
    pub device_code: String,

    #[serde(default = "default_ping_enabled")]
    pub ping_enabled: bool,
}

/// Watch thresholds and per-measurement enable flags
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    #[serde(default = "default_watching")]
    pub depth_watching: bool,

    /// Metres; alarm below this.
    #[serde(default = "default_depth_min")]
    pub depth_min: f32,

    /// Metres; alarm above this.
    #[serde(default = "default_depth_max")]
    pub depth_max: f32,

    #[serde(default = "default_watching")]
    pub wind_watching: bool,

    /// Knots.
    #[serde(default = "default_wind_max")]
    pub wind_max: f32,

    #[serde(default = "default_watching")]
    pub heading_change_watching: bool,

    /// Degrees of swing from the heading captured at watch start.
    #[serde(default = "default_heading_change_max")]
    pub heading_change_max: f32,

    #[serde(default = "default_watching")]
    pub pressure_change_watching: bool,

    /// Millibars of change from the pressure captured at watch start.
    #[serde(default = "default_pressure_change_max")]
    pub pressure_change_max: f32,

    #[serde(default = "default_watching")]
    pub sog_watching: bool,

    /// Knots.
    #[serde(default = "default_sog_max")]
    pub sog_max: f32,

    #[serde(default = "default_watching")]
    pub position_change_watching: bool,

    /// Metres of drift from the position captured at watch start.
    #[serde(default = "default_position_change_max")]
    pub position_change_max: f32,
}

// Default value functions
fn default_transport() -> TransportKind { TransportKind::Serial }
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 4800 }
fn default_broker_host() -> String { "broker.emqx.io".to_string() }
fn default_broker_port() -> u16 { 1883 }
fn default_device_code() -> String { "0000".to_string() }
fn default_ping_enabled() -> bool { true }

fn default_watching() -> bool { true }
fn default_depth_min() -> f32 { 2.0 }
fn default_depth_max() -> f32 { 5.0 }
fn default_wind_max() -> f32 { 20.0 }
fn default_heading_change_max() -> f32 { 40.0 }
fn default_pressure_change_max() -> f32 { 12.0 }
fn default_sog_max() -> f32 { 2.0 }
fn default_position_change_max() -> f32 { 50.0 }

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
            broker_host: default_broker_host(),
            broker_port: default_broker_port(),
            device_code: default_device_code(),
            ping_enabled: default_ping_enabled(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            depth_watching: default_watching(),
            depth_min: default_depth_min(),
            depth_max: default_depth_max(),
            wind_watching: default_watching(),
            wind_max: default_wind_max(),
            heading_change_watching: default_watching(),
            heading_change_max: default_heading_change_max(),
            pressure_change_watching: default_watching(),
            pressure_change_max: default_pressure_change_max(),
            sog_watching: default_watching(),
            sog_max: default_sog_max(),
            position_change_watching: default_watching(),
            position_change_max: default_position_change_max(),
        }
    }
}

impl WatchConfig {
    /// Whether at least one measurement is enabled for watching.
    pub fn any_enabled(&self) -> bool {
        self.depth_watching
            || self.wind_watching
            || self.heading_change_watching
            || self.pressure_change_watching
            || self.sog_watching
            || self.position_change_watching
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use anchor_watch::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or fall back to defaults when the
    /// file does not exist yet (first run).
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist the configuration, including any threshold changes made at
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the file write fails
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration values
    ///
    /// Only structural validity lives here. The depth min/max ordering is
    /// deliberately NOT checked at load time: the user may fix it from the
    /// settings screen, and starting a watch re-checks it with a clear
    /// message.
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.connection.transport == TransportKind::Serial && self.connection.serial_port.is_empty() {
            return Err(crate::error::AnchorWatchError::Config(
                toml::de::Error::custom("serial_port cannot be empty for the serial transport")
            ));
        }

        if self.connection.transport == TransportKind::Bus && self.connection.broker_host.is_empty() {
            return Err(crate::error::AnchorWatchError::Config(
                toml::de::Error::custom("broker_host cannot be empty for the bus transport")
            ));
        }

        if self.connection.baud_rate == 0 {
            return Err(crate::error::AnchorWatchError::Config(
                toml::de::Error::custom("baud_rate must be greater than 0")
            ));
        }

        if self.connection.device_code.is_empty()
            || !self.connection.device_code.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::error::AnchorWatchError::Config(
                toml::de::Error::custom("device_code must be a non-empty hex string")
            ));
        }

        for (name, value) in [
            ("depth_min", self.watch.depth_min),
            ("depth_max", self.watch.depth_max),
            ("wind_max", self.watch.wind_max),
            ("heading_change_max", self.watch.heading_change_max),
            ("pressure_change_max", self.watch.pressure_change_max),
            ("sog_max", self.watch.sog_max),
            ("position_change_max", self.watch.position_change_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(crate::error::AnchorWatchError::Config(
                    toml::de::Error::custom(format!("{} must be a non-negative number", name))
                ));
            }
        }

        Ok(())
    }
}
