//! # Telemetry Sentence Decoder
//!
//! Parses one framed sentence into typed channel updates.
//!
//! Only the sentence types this system needs are recognized (DPT, XDR, HDT,
//! MWV, RMC); checksums are not validated. Any malformed numeric field is
//! dropped silently, updating nothing: real-world instrument feeds contain
//! too much partial garbage to treat a bad field as an error.

use tracing::trace;

use crate::telemetry::{Channel, ChannelUpdate};

/// Offset of the 3-char sentence type within the address field, past the
/// 2-char talker ID (e.g. `$GPRMC` -> `RMC`).
const TYPE_OFFSET: usize = 3;
const TYPE_LEN: usize = 3;

/// Decode one framed sentence into zero or more channel updates.
///
/// The caller stamps the receipt time when applying the updates to the
/// store; a sentence that decodes nothing simply returns an empty vec.
///
/// # Examples
///
/// ```
/// use anchor_watch::nmea::decoder::decode_sentence;
/// use anchor_watch::telemetry::Channel;
///
/// let updates = decode_sentence("$GPDPT,3.2,");
/// assert_eq!(updates[0].channel, Channel::Depth);
/// assert_eq!(updates[0].value, 3.2);
/// ```
pub fn decode_sentence(sentence: &str) -> Vec<ChannelUpdate> {
    // split(',') always yields at least one element, so the address field
    // exists even for an empty input.
    let fields: Vec<&str> = sentence.split(',').collect();
    let address = fields[0];
    // `get` rather than slicing: a short address field, or a stray non-ASCII
    // byte landing on the boundary, must reject the sentence, not panic.
    let Some(sentence_type) = address.get(TYPE_OFFSET..TYPE_OFFSET + TYPE_LEN) else {
        trace!("unusable address field: {:?}", address);
        return Vec::new();
    };

    match sentence_type {
        "DPT" => decode_single(&fields, 2, 1, Channel::Depth, 1.0),
        "XDR" => decode_single(&fields, 3, 2, Channel::Pressure, 1000.0),
        "HDT" => decode_single(&fields, 2, 1, Channel::Heading, 1.0),
        "MWV" => decode_single(&fields, 4, 3, Channel::WindSpeed, 1.0),
        "RMC" => decode_rmc(&fields),
        _ => Vec::new(),
    }
}

/// Decode a one-value sentence: parse `fields[value_index]` and scale it.
fn decode_single(
    fields: &[&str],
    min_fields: usize,
    value_index: usize,
    channel: Channel,
    scale: f32,
) -> Vec<ChannelUpdate> {
    if fields.len() < min_fields {
        return Vec::new();
    }
    match fields[value_index].parse::<f32>() {
        Ok(value) => vec![ChannelUpdate {
            channel,
            value: value * scale,
        }],
        Err(_) => Vec::new(),
    }
}

/// Decode an RMC sentence: SOG plus latitude/longitude.
///
/// Requires status "A" (valid fix). Each of the three values decodes
/// independently; a coordinate needs both its numeric field and its
/// hemisphere field to parse before it produces an update.
fn decode_rmc(fields: &[&str]) -> Vec<ChannelUpdate> {
    let mut updates = Vec::new();

    if fields.len() < 8 || fields[2] != "A" {
        return updates;
    }

    if let Ok(sog) = fields[7].parse::<f32>() {
        updates.push(ChannelUpdate {
            channel: Channel::SpeedOverGround,
            value: sog,
        });
    }

    if let Some(latitude) = decode_coordinate(fields[3], fields[4], "N", "S") {
        updates.push(ChannelUpdate {
            channel: Channel::Latitude,
            value: latitude,
        });
    }

    if let Some(longitude) = decode_coordinate(fields[5], fields[6], "E", "W") {
        updates.push(ChannelUpdate {
            channel: Channel::Longitude,
            value: longitude,
        });
    }

    updates
}

/// Decode a DDMM.MMMM coordinate with its hemisphere field.
///
/// `degrees = floor(raw / 100)`, `fraction = (raw / 100 - degrees) / 0.6`.
/// The negative hemisphere negates the value; any hemisphere other than the
/// two expected letters invalidates the coordinate even if the numeric
/// parse succeeded.
fn decode_coordinate(raw: &str, hemisphere: &str, positive: &str, negative: &str) -> Option<f32> {
    let raw: f32 = raw.parse().ok()?;
    let scaled = raw / 100.0;
    let degrees = scaled.floor();
    let value = degrees + (scaled - degrees) / 0.6;

    if hemisphere == positive {
        Some(value)
    } else if hemisphere == negative {
        Some(-value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(sentence: &str) -> ChannelUpdate {
        let updates = decode_sentence(sentence);
        assert_eq!(updates.len(), 1, "expected one update from {:?}", sentence);
        updates[0]
    }

    #[test]
    fn test_decode_dpt() {
        let update = single("$GPDPT,12.7,");
        assert_eq!(update.channel, Channel::Depth);
        assert_eq!(update.value, 12.7);
    }

    #[test]
    fn test_decode_xdr_scales_to_millibars() {
        let update = single("$WIXDR,P,1.0132,B,0");
        assert_eq!(update.channel, Channel::Pressure);
        assert!((update.value - 1013.2).abs() < 0.05);
    }

    #[test]
    fn test_decode_hdt() {
        let update = single("$HEHDT,274.5,T");
        assert_eq!(update.channel, Channel::Heading);
        assert_eq!(update.value, 274.5);
    }

    #[test]
    fn test_decode_mwv() {
        let update = single("$WIMWV,45.0,R,18.3,N,A");
        assert_eq!(update.channel, Channel::WindSpeed);
        assert_eq!(update.value, 18.3);
    }

    #[test]
    fn test_decode_rmc_valid_fix() {
        let updates = decode_sentence("$GPRMC,,A,6012.34,N,00512.45,E,,5.0,,,,,");
        assert_eq!(updates.len(), 3);

        let sog = updates
            .iter()
            .find(|u| u.channel == Channel::SpeedOverGround)
            .expect("SOG update");
        assert_eq!(sog.value, 5.0);

        let latitude = updates
            .iter()
            .find(|u| u.channel == Channel::Latitude)
            .expect("latitude update");
        // 6012.34 -> 60 degrees + (12.34 / 60) minutes
        assert!((latitude.value - 60.205666).abs() < 0.001);

        let longitude = updates
            .iter()
            .find(|u| u.channel == Channel::Longitude)
            .expect("longitude update");
        assert!((longitude.value - 5.2075).abs() < 0.001);
    }

    #[test]
    fn test_decode_rmc_void_fix_updates_nothing() {
        let updates = decode_sentence("$GPRMC,,V,6012.34,N,00512.45,E,,5.0,,,,,");
        assert!(updates.is_empty());
    }

    #[test]
    fn test_ddmm_known_value() {
        // Raw 4530.00 with N hemisphere is exactly 45.5 degrees
        let value = decode_coordinate("4530.00", "N", "N", "S").expect("parses");
        assert!((value - 45.5).abs() < 1e-5);
    }

    #[test]
    fn test_southern_and_western_hemispheres_negate() {
        let lat = decode_coordinate("4530.00", "S", "N", "S").expect("parses");
        assert!((lat + 45.5).abs() < 1e-5);
        let lon = decode_coordinate("00512.45", "W", "E", "W").expect("parses");
        assert!(lon < 0.0);
    }

    #[test]
    fn test_bad_hemisphere_invalidates_coordinate() {
        // Numeric parse succeeds, hemisphere does not: no update at all
        assert!(decode_coordinate("4530.00", "X", "N", "S").is_none());

        let updates = decode_sentence("$GPRMC,,A,6012.34,Q,00512.45,E,,5.0,,,,,");
        assert!(updates.iter().all(|u| u.channel != Channel::Latitude));
        assert!(updates.iter().any(|u| u.channel == Channel::Longitude));
    }

    #[test]
    fn test_rmc_partial_decode_keeps_good_fields() {
        // Unparseable SOG, good coordinates
        let updates = decode_sentence("$GPRMC,,A,6012.34,N,00512.45,E,,bogus,,,,,");
        assert!(updates.iter().all(|u| u.channel != Channel::SpeedOverGround));
        assert!(updates.iter().any(|u| u.channel == Channel::Latitude));
        assert!(updates.iter().any(|u| u.channel == Channel::Longitude));
    }

    #[test]
    fn test_malformed_numeric_field_dropped() {
        assert!(decode_sentence("$GPDPT,abc,").is_empty());
        assert!(decode_sentence("$HEHDT,,T").is_empty());
    }

    #[test]
    fn test_too_few_fields_dropped() {
        assert!(decode_sentence("$GPDPT").is_empty());
        assert!(decode_sentence("$WIMWV,45.0,R").is_empty());
        assert!(decode_sentence("$GPRMC,,A,6012.34").is_empty());
    }

    #[test]
    fn test_short_address_field_rejected() {
        assert!(decode_sentence("$DPT,3.0,").is_empty());
        assert!(decode_sentence("$GP").is_empty());
        assert!(decode_sentence("").is_empty());
    }

    #[test]
    fn test_unrecognized_type_ignored() {
        assert!(decode_sentence("$GPGGA,123519,4807.038,N,01131.000,E,1,08").is_empty());
    }
}
