//! Instrument `inst` chunk: seven signed bytes of playback hints.

use crate::prelude::*;

/// Fields in on-disk order with their encode defaults.
const FIELDS: [(&str, i64); 7] = [
    ("MidiUnityNote", 60),
    ("Detune", 0),
    ("Gain", 0),
    ("LowNote", 0),
    ("HighNote", 127),
    ("LowVelocity", 1),
    ("HighVelocity", 127),
];

pub fn decode(body: &[u8], map: &mut MetadataMap) {
    for (i, (key, _)) in FIELDS.iter().enumerate() {
        let value = body.get(i).map_or(0, |&b| b as i8);
        map.set_value(*key, value);
    }
}

/// Encodes the 7-byte body; written only when both note bounds are known.
pub fn encode(map: &MetadataMap) -> Vec<u8> {
    if !map.contains_key("LowNote") || !map.contains_key("HighNote") {
        return Vec::new();
    }

    FIELDS
        .iter()
        .map(|(key, default)| map.int_or(key, *default) as i8 as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_signed_values() {
        let mut map = MetadataMap::new();
        map.set_value("LowNote", 36);
        map.set_value("HighNote", 96);
        map.set_value("Detune", -12);
        map.set_value("Gain", -6);

        let body = encode(&map);
        assert_eq!(body, vec![60, 0xF4, 0xFA, 36, 96, 1, 127]);

        let mut decoded = MetadataMap::new();
        decode(&body, &mut decoded);
        assert_eq!(decoded.text("MidiUnityNote"), "60");
        assert_eq!(decoded.text("Detune"), "-12");
        assert_eq!(decoded.text("Gain"), "-6");
        assert_eq!(decoded.text("HighVelocity"), "127");
    }

    #[test]
    fn test_requires_both_note_bounds() {
        let mut map = MetadataMap::new();
        map.set_value("LowNote", 0);
        assert!(encode(&map).is_empty());
    }

    #[test]
    fn test_short_body_reads_zero() {
        let mut map = MetadataMap::new();
        decode(&[72, 5], &mut map);
        assert_eq!(map.text("MidiUnityNote"), "72");
        assert_eq!(map.text("Detune"), "5");
        assert_eq!(map.text("HighVelocity"), "0");
    }
}
