//! # Message-Bus Record Decoder
//!
//! Decodes the fixed-position comma-separated record published by the boat
//! unit over the message bus. The record carries many more fields than this
//! system watches; only the watched positions are extracted.
//!
//! This is deliberately a separate decoder from the sentence path: the two
//! layouts are independently defined by their producers and happen to share
//! channel names, nothing more.

use crate::telemetry::{Channel, ChannelUpdate};

/// Record field positions, as published by the boat unit.
pub mod fields {
    pub const SIGNAL_STRENGTH: usize = 0;
    pub const SPEED_OVER_GROUND: usize = 3;
    pub const HEADING: usize = 7;
    pub const DEPTH: usize = 8;
    pub const WIND_SPEED: usize = 9;
    pub const LATITUDE: usize = 13;
    pub const LONGITUDE: usize = 14;
    pub const PRESSURE: usize = 15;
}

/// A decoded record: channel updates plus the link signal-strength bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub updates: Vec<ChannelUpdate>,
    /// Discrete 0-5 signal bucket, 0 when the field is absent or malformed.
    pub signal_bucket: u8,
}

/// Decode one record payload.
///
/// Every field parses independently; a malformed or empty field produces no
/// update for its channel and leaves the rest of the record intact.
pub fn decode_record(payload: &str) -> DecodedRecord {
    let record: Vec<&str> = payload.split(',').collect();

    let channel_fields = [
        (fields::SPEED_OVER_GROUND, Channel::SpeedOverGround),
        (fields::HEADING, Channel::Heading),
        (fields::DEPTH, Channel::Depth),
        (fields::WIND_SPEED, Channel::WindSpeed),
        (fields::LATITUDE, Channel::Latitude),
        (fields::LONGITUDE, Channel::Longitude),
        (fields::PRESSURE, Channel::Pressure),
    ];

    let mut updates = Vec::new();
    for (index, channel) in channel_fields {
        if let Some(value) = record.get(index).and_then(|f| f.parse::<f32>().ok()) {
            updates.push(ChannelUpdate { channel, value });
        }
    }

    let signal_bucket = record
        .get(fields::SIGNAL_STRENGTH)
        .and_then(|f| f.parse::<f32>().ok())
        .map(signal_strength_bucket)
        .unwrap_or(0);

    DecodedRecord {
        updates,
        signal_bucket,
    }
}

/// Map raw signal strength to a discrete 0-5 display bucket.
pub fn signal_strength_bucket(raw: f32) -> u8 {
    if raw < 1.0 {
        0
    } else if raw < 9.0 {
        1
    } else if raw < 15.0 {
        2
    } else if raw < 21.0 {
        3
    } else if raw < 27.0 {
        4
    } else {
        5
    }
}
