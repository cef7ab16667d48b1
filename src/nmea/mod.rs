//! # Telemetry Ingestion Module
//!
//! Two independent ingestion paths produce [`ChannelUpdate`]s:
//!
//! - [`framer`] + [`decoder`]: NMEA-0183-like sentences framed out of a raw
//!   byte stream from a serial-like transport.
//! - [`record`]: fixed-position comma-separated records delivered by a
//!   message-bus subscription.
//!
//! [`ChannelUpdate`]: crate::telemetry::ChannelUpdate

pub mod decoder;
pub mod framer;
pub mod record;
