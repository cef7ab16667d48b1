//! # Telemetry Store Module
//!
//! Holds the latest value and receipt time for each instrument channel.
//! Pure data: the store has no alarm or freshness policy of its own beyond
//! the per-channel maximum data age table.
//!
//! A channel that has never been updated is absent from the store and is
//! treated as infinitely stale by every consumer.

use std::time::{Duration, Instant};

/// One named instrument measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Depth,
    Pressure,
    Heading,
    WindSpeed,
    SpeedOverGround,
    Latitude,
    Longitude,
}

/// Number of channels, for fixed-size storage.
pub const CHANNEL_COUNT: usize = 7;

impl Channel {
    /// All channels, in storage order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Depth,
        Channel::Pressure,
        Channel::Heading,
        Channel::WindSpeed,
        Channel::SpeedOverGround,
        Channel::Latitude,
        Channel::Longitude,
    ];

    fn index(self) -> usize {
        match self {
            Channel::Depth => 0,
            Channel::Pressure => 1,
            Channel::Heading => 2,
            Channel::WindSpeed => 3,
            Channel::SpeedOverGround => 4,
            Channel::Latitude => 5,
            Channel::Longitude => 6,
        }
    }

    /// Maximum age before this channel's data counts as stale.
    ///
    /// A single table rather than per-call-site constants: pressure moves
    /// slowly and is reported far less often than the GPS-derived channels.
    pub fn max_data_age(self) -> Duration {
        match self {
            Channel::Pressure => Duration::from_secs(60),
            _ => Duration::from_secs(40),
        }
    }

    /// Short lowercase name used in log output.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Depth => "depth",
            Channel::Pressure => "pressure",
            Channel::Heading => "heading",
            Channel::WindSpeed => "windspeed",
            Channel::SpeedOverGround => "sog",
            Channel::Latitude => "latitude",
            Channel::Longitude => "longitude",
        }
    }
}

/// Latest decoded value for one channel plus the moment it arrived.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub value: f32,
    pub received_at: Instant,
}

/// A decoded channel value ready to be applied to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelUpdate {
    pub channel: Channel,
    pub value: f32,
}

/// Latest value and receipt time per channel.
///
/// `received_at` advances only on a successful decode of that channel;
/// decoders drop malformed fields without touching the store.
#[derive(Debug, Clone, Default)]
pub struct TelemetryStore {
    readings: [Option<Reading>; CHANNEL_COUNT],
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully decoded value, stamping its receipt time.
    pub fn update(&mut self, channel: Channel, value: f32, now: Instant) {
        self.readings[channel.index()] = Some(Reading {
            value,
            received_at: now,
        });
    }

    /// Apply a batch of decoded updates with a single receipt time.
    pub fn apply(&mut self, updates: &[ChannelUpdate], now: Instant) {
        for update in updates {
            self.update(update.channel, update.value, now);
        }
    }

    pub fn reading(&self, channel: Channel) -> Option<Reading> {
        self.readings[channel.index()]
    }

    pub fn value(&self, channel: Channel) -> Option<f32> {
        self.reading(channel).map(|r| r.value)
    }

    /// Whether the channel has data younger than its maximum age.
    ///
    /// A channel that has never been updated is infinitely stale.
    pub fn is_fresh(&self, channel: Channel, now: Instant) -> bool {
        match self.reading(channel) {
            Some(reading) => now.duration_since(reading.received_at) <= channel.max_data_age(),
            None => false,
        }
    }

    /// Current value, but only if it is fresh.
    pub fn fresh_value(&self, channel: Channel, now: Instant) -> Option<f32> {
        if self.is_fresh(channel, now) {
            self.value(channel)
        } else {
            None
        }
    }

    /// Forget all readings, e.g. after a transport disconnect.
    pub fn clear(&mut self) {
        self.readings = [None; CHANNEL_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_channel_is_stale() {
        let store = TelemetryStore::new();
        let now = Instant::now();
        assert!(!store.is_fresh(Channel::Depth, now));
        assert!(store.value(Channel::Depth).is_none());
    }

    #[test]
    fn test_update_makes_channel_fresh() {
        let mut store = TelemetryStore::new();
        let now = Instant::now();
        store.update(Channel::Depth, 3.5, now);

        assert!(store.is_fresh(Channel::Depth, now));
        assert_eq!(store.value(Channel::Depth), Some(3.5));
        // Other channels untouched
        assert!(!store.is_fresh(Channel::WindSpeed, now));
    }

    #[test]
    fn test_channel_goes_stale_after_max_age() {
        let mut store = TelemetryStore::new();
        let base = Instant::now();
        store.update(Channel::WindSpeed, 12.0, base);

        let just_inside = base + Channel::WindSpeed.max_data_age();
        assert!(store.is_fresh(Channel::WindSpeed, just_inside));

        let just_outside = base + Channel::WindSpeed.max_data_age() + Duration::from_millis(1);
        assert!(!store.is_fresh(Channel::WindSpeed, just_outside));
        // Value is still readable, just not fresh
        assert_eq!(store.value(Channel::WindSpeed), Some(12.0));
        assert_eq!(store.fresh_value(Channel::WindSpeed, just_outside), None);
    }

    #[test]
    fn test_pressure_has_longer_max_age() {
        assert_eq!(Channel::Pressure.max_data_age(), Duration::from_secs(60));
        for channel in Channel::ALL {
            if channel != Channel::Pressure {
                assert_eq!(channel.max_data_age(), Duration::from_secs(40));
            }
        }
    }

    #[test]
    fn test_apply_batch() {
        let mut store = TelemetryStore::new();
        let now = Instant::now();
        let updates = [
            ChannelUpdate {
                channel: Channel::Latitude,
                value: 60.2,
            },
            ChannelUpdate {
                channel: Channel::Longitude,
                value: 5.2,
            },
        ];
        store.apply(&updates, now);

        assert_eq!(store.value(Channel::Latitude), Some(60.2));
        assert_eq!(store.value(Channel::Longitude), Some(5.2));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut store = TelemetryStore::new();
        let now = Instant::now();
        store.update(Channel::Heading, 180.0, now);
        store.clear();
        assert!(store.reading(Channel::Heading).is_none());
    }
}
