//! # Anchor Watch Library
//!
//! Monitor a vessel's anchor position and instrument readings, raising an
//! alarm when telemetry goes stale or exceeds configured thresholds.
//!
//! Telemetry arrives as an NMEA-0183-like byte stream over a serial-like
//! transport, or as a fixed-position comma-separated record from a message
//! bus subscription. The library frames and decodes both, tracks drift from
//! the anchor reference point, and drives the staleness/threshold alarm
//! state machine.

pub mod alarm;
pub mod config;
pub mod drift;
pub mod error;
pub mod monitor;
pub mod nmea;
pub mod telemetry;
pub mod transport;
