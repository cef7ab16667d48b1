//! # Drift Tracker
//!
//! Converts absolute positions into local-metre offsets from the anchor
//! reference point and keeps a bounded trail of them for plotting.
//!
//! ## Sign Convention
//!
//! North is positive y in geographic space, but the trail stores y with a
//! vertical flip so that increasing y renders downward in screen space.
//! The flip is applied explicitly at the single insertion point.

use std::time::{Duration, Instant};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_METRES: f32 = 6_371_000.0;

/// Degree-to-radian divisor. Intentionally the approximate 57.296 rather
/// than `180/PI`, kept bit-compatible with prior behavior.
pub const DEGREES_TO_RADS: f32 = 57.296;

/// Maximum number of trail samples retained.
pub const TRAIL_CAPACITY: usize = 250;

/// Minimum interval between recorded trail samples.
pub const TRAIL_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Local-metre offset from the anchor reference, screen sign convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftSample {
    pub x_metres: f32,
    pub y_metres: f32,
}

/// Anchor position captured the moment watching starts; immutable until
/// the next start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorReference {
    pub latitude: f32,
    pub longitude: f32,
}

/// Bounded drift trail relative to an anchor reference.
#[derive(Debug, Default)]
pub struct DriftTracker {
    reference: Option<AnchorReference>,
    samples: Vec<DriftSample>,
    cursor: usize,
    last_sample_time: Option<Instant>,
}

impl DriftTracker {
    pub fn new() -> Self {
        Self {
            reference: None,
            samples: Vec::with_capacity(TRAIL_CAPACITY),
            cursor: 0,
            last_sample_time: None,
        }
    }

    /// Capture a new anchor reference and clear the trail.
    pub fn set_reference(&mut self, latitude: f32, longitude: f32) {
        self.reference = Some(AnchorReference {
            latitude,
            longitude,
        });
        self.clear_trail();
    }

    pub fn reference(&self) -> Option<AnchorReference> {
        self.reference
    }

    /// Discard all trail samples, keeping the reference.
    pub fn clear_trail(&mut self) {
        self.samples.clear();
        self.cursor = 0;
        self.last_sample_time = None;
    }

    /// Record a trail sample if the sample interval has elapsed.
    ///
    /// Uses the equirectangular approximation: fine at anchor-swing scale,
    /// metres of error only over kilometres. Returns whether a sample was
    /// recorded. Without a reference, records nothing.
    pub fn record_if_due(&mut self, now: Instant, latitude: f32, longitude: f32) -> bool {
        let Some(reference) = self.reference else {
            return false;
        };
        if let Some(last) = self.last_sample_time {
            if now.duration_since(last) < TRAIL_SAMPLE_INTERVAL {
                return false;
            }
        }
        self.last_sample_time = Some(now);

        let ref_lat_rads = reference.latitude / DEGREES_TO_RADS;
        let ref_lon_rads = reference.longitude / DEGREES_TO_RADS;
        let lat_rads = latitude / DEGREES_TO_RADS;
        let lon_rads = longitude / DEGREES_TO_RADS;

        let x = (lon_rads - ref_lon_rads) * ((ref_lat_rads + lat_rads) / 2.0).cos()
            * EARTH_RADIUS_METRES;
        let y = (lat_rads - ref_lat_rads) * EARTH_RADIUS_METRES;

        // Vertical flip: north-positive y becomes screen-down y
        self.push_sample(DriftSample {
            x_metres: x,
            y_metres: -y,
        });
        true
    }

    /// Great-circle distance from the reference to the given point, or
    /// `None` before a reference is set.
    pub fn distance_from_reference(&self, latitude: f32, longitude: f32) -> Option<f32> {
        self.reference.map(|reference| {
            distance_between_points(reference.latitude, reference.longitude, latitude, longitude)
        })
    }

    /// Number of retained samples, saturating at [`TRAIL_CAPACITY`].
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Trail samples in chronological order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DriftSample> {
        let (older, newer) = if self.samples.len() < TRAIL_CAPACITY {
            (&self.samples[..], &self.samples[..0])
        } else {
            // Write cursor points at the oldest sample once wrapped
            let (newer, older) = self.samples.split_at(self.cursor);
            (older, newer)
        };
        older.iter().chain(newer.iter())
    }

    fn push_sample(&mut self, sample: DriftSample) {
        if self.samples.len() < TRAIL_CAPACITY {
            self.samples.push(sample);
        } else {
            self.samples[self.cursor] = sample;
        }
        self.cursor = (self.cursor + 1) % TRAIL_CAPACITY;
    }
}

/// Haversine distance in metres between two points given in degrees.
pub fn distance_between_points(lat1: f32, lon1: f32, lat2: f32, lon2: f32) -> f32 {
    let lat1 = lat1 / DEGREES_TO_RADS;
    let lon1 = lon1 / DEGREES_TO_RADS;
    let lat2 = lat2 / DEGREES_TO_RADS;
    let lon2 = lon2 / DEGREES_TO_RADS;

    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlon = (lon2 - lon1) / 2.0;
    let a = half_dlat.sin() * half_dlat.sin()
        + half_dlon.sin() * half_dlon.sin() * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METRES * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with_reference() -> DriftTracker {
        let mut tracker = DriftTracker::new();
        tracker.set_reference(60.0, 5.0);
        tracker
    }

    /// Fill the trail bypassing the sample-interval gate.
    fn fill(tracker: &mut DriftTracker, count: usize) {
        for i in 0..count {
            tracker.push_sample(DriftSample {
                x_metres: i as f32,
                y_metres: 0.0,
            });
        }
    }

    #[test]
    fn test_distance_between_identical_points_is_zero() {
        assert_eq!(distance_between_points(60.0, 5.0, 60.0, 5.0), 0.0);
    }

    #[test]
    fn test_distance_one_degree_of_latitude() {
        // ~111,195 m per degree with R = 6,371,000 (the 57.296 divisor
        // shifts this slightly from the exact figure)
        let d = distance_between_points(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 150.0, "got {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = distance_between_points(60.0, 5.0, 60.01, 5.02);
        let b = distance_between_points(60.01, 5.02, 60.0, 5.0);
        assert!((a - b).abs() < 0.01);
    }

    #[test]
    fn test_ring_buffer_saturates_at_capacity() {
        let mut tracker = tracker_with_reference();
        fill(&mut tracker, TRAIL_CAPACITY + 1);

        assert_eq!(tracker.len(), TRAIL_CAPACITY);
        let samples: Vec<f32> = tracker.iter().map(|s| s.x_metres).collect();
        // Oldest (x=0) evicted, newest (x=250) present, order preserved
        assert_eq!(samples.first(), Some(&1.0));
        assert_eq!(samples.last(), Some(&250.0));
        assert_eq!(samples.len(), TRAIL_CAPACITY);
    }

    #[test]
    fn test_ring_buffer_chronological_iteration_before_wrap() {
        let mut tracker = tracker_with_reference();
        fill(&mut tracker, 3);
        let samples: Vec<f32> = tracker.iter().map(|s| s.x_metres).collect();
        assert_eq!(samples, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_set_reference_clears_trail() {
        let mut tracker = tracker_with_reference();
        fill(&mut tracker, 10);
        tracker.set_reference(61.0, 6.0);
        assert!(tracker.is_empty());
        assert_eq!(tracker.reference().map(|r| r.latitude), Some(61.0));
    }

    #[test]
    fn test_record_requires_reference() {
        let mut tracker = DriftTracker::new();
        assert!(!tracker.record_if_due(Instant::now(), 60.0, 5.0));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_record_respects_sample_interval() {
        let mut tracker = tracker_with_reference();
        let base = Instant::now();

        assert!(tracker.record_if_due(base, 60.0001, 5.0));
        // Too soon
        assert!(!tracker.record_if_due(base + Duration::from_secs(3), 60.0002, 5.0));
        assert_eq!(tracker.len(), 1);
        // Interval elapsed
        assert!(tracker.record_if_due(base + Duration::from_secs(6), 60.0002, 5.0));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_trail_sample_y_is_flipped() {
        let mut tracker = tracker_with_reference();
        let base = Instant::now();
        // Move north: geographic y positive, stored y negative
        tracker.record_if_due(base, 60.001, 5.0);
        let sample = tracker.iter().next().expect("one sample");
        assert!(sample.y_metres < 0.0, "north must store as negative y");
        assert!(sample.x_metres.abs() < 0.5);
    }

    #[test]
    fn test_equirectangular_x_shrinks_with_latitude() {
        let mut equator = DriftTracker::new();
        equator.set_reference(0.0, 5.0);
        let mut north = DriftTracker::new();
        north.set_reference(60.0, 5.0);

        let base = Instant::now();
        equator.record_if_due(base, 0.0, 5.001);
        north.record_if_due(base, 60.0, 5.001);

        let x_equator = equator.iter().next().expect("sample").x_metres;
        let x_north = north.iter().next().expect("sample").x_metres;
        // cos(60 deg) is 0.5: the same longitude step is half the metres
        assert!((x_north / x_equator - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_distance_from_reference() {
        let tracker = tracker_with_reference();
        let d = tracker
            .distance_from_reference(60.0, 5.0)
            .expect("reference set");
        assert_eq!(d, 0.0);

        let d = tracker
            .distance_from_reference(60.0005, 5.0)
            .expect("reference set");
        assert!(d > 40.0 && d < 70.0, "got {}", d);
    }
}
