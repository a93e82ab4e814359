//! Broadcast Wave `bext` chunk (EBU Tech 3285).

use crate::codecs::chunk::{put_text_field, text_field};
use crate::prelude::*;

pub const DESCRIPTION: &str = "bwav description";
pub const ORIGINATOR: &str = "bwav originator";
pub const ORIGINATOR_REF: &str = "bwav originator ref";
pub const ORIGINATION_DATE: &str = "bwav origination date";
pub const ORIGINATION_TIME: &str = "bwav origination time";
pub const TIME_REFERENCE: &str = "bwav time reference";
pub const CODING_HISTORY: &str = "bwav coding history";
pub const VERSION: &str = "bwav version";
pub const UMID: &str = "bwav umid";
pub const LOUDNESS_VALUE: &str = "bwav loudness value";
pub const LOUDNESS_RANGE: &str = "bwav loudness range";
pub const MAX_TRUE_PEAK_LEVEL: &str = "bwav max true peak level";
pub const MAX_MOMENTARY_LOUDNESS: &str = "bwav max momentary loudness";
pub const MAX_SHORT_TERM_LOUDNESS: &str = "bwav max short term loudness";

/// Size of the fixed part of the chunk; coding history follows it.
pub const BEXT_HEADER_SIZE: usize = 602;

// Field layout
const DESCRIPTION_FIELD: (usize, usize) = (0, 256);
const ORIGINATOR_FIELD: (usize, usize) = (256, 288);
const ORIGINATOR_REF_FIELD: (usize, usize) = (288, 320);
const DATE_FIELD: (usize, usize) = (320, 330);
const TIME_FIELD: (usize, usize) = (330, 338);
const TIME_REF_LOW: usize = 338;
const TIME_REF_HIGH: usize = 342;
const VERSION_OFFSET: usize = 346;
const UMID_FIELD: (usize, usize) = (348, 412);

/// EBU v2 loudness fields at the start of the reserved area. Only the range
/// is unsigned.
const LOUDNESS_FIELDS: [(&str, usize, bool); 5] = [
    (LOUDNESS_VALUE, 412, true),
    (LOUDNESS_RANGE, 414, false),
    (MAX_TRUE_PEAK_LEVEL, 416, true),
    (MAX_MOMENTARY_LOUDNESS, 418, true),
    (MAX_SHORT_TERM_LOUDNESS, 420, true),
];

const TEXT_FIELDS: [(&str, (usize, usize)); 5] = [
    (DESCRIPTION, DESCRIPTION_FIELD),
    (ORIGINATOR, ORIGINATOR_FIELD),
    (ORIGINATOR_REF, ORIGINATOR_REF_FIELD),
    (ORIGINATION_DATE, DATE_FIELD),
    (ORIGINATION_TIME, TIME_FIELD),
];

fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Decodes a `bext` body. Short bodies read as if zero-filled to 602 bytes.
pub fn decode(body: &[u8], map: &mut MetadataMap) {
    let mut data = body.to_vec();
    if data.len() < BEXT_HEADER_SIZE {
        data.resize(BEXT_HEADER_SIZE, 0);
    }

    for (key, (start, end)) in TEXT_FIELDS {
        map.set_value(key, text_field(&data[start..end]));
    }

    let time = (u32_at(&data, TIME_REF_HIGH) as u64) << 32 | u32_at(&data, TIME_REF_LOW) as u64;
    map.set_value(TIME_REFERENCE, time);
    map.set_value(CODING_HISTORY, text_field(&data[BEXT_HEADER_SIZE..]));

    let version = u16_at(&data, VERSION_OFFSET);
    if version != 0 {
        map.set_value(VERSION, version);
    }

    let umid = &data[UMID_FIELD.0..UMID_FIELD.1];
    if umid.iter().any(|&b| b != 0) {
        let hex: String = umid.iter().map(|b| format!("{:02X}", b)).collect();
        map.set_value(UMID, hex);
    }

    for (key, offset, signed) in LOUDNESS_FIELDS {
        let raw = u16_at(&data, offset);
        if raw != 0 {
            if signed {
                map.set_value(key, raw as i16);
            } else {
                map.set_value(key, raw);
            }
        }
    }
}

/// Encodes the `bext` body, or nothing when there is no broadcast info to store.
pub fn encode(map: &MetadataMap) -> Vec<u8> {
    let history = map.text(CODING_HISTORY);
    let time = map.int_or(TIME_REFERENCE, 0);

    let has_text = TEXT_FIELDS.iter().any(|(key, _)| !map.text(key).is_empty());
    if !has_text && history.is_empty() && time == 0 {
        return Vec::new();
    }

    let size = BEXT_HEADER_SIZE + history.len();
    let mut data = vec![0u8; size + (size & 1)];

    for (key, (start, end)) in TEXT_FIELDS {
        put_text_field(&mut data[start..end], map.text(key));
    }

    let time = time as u64;
    data[TIME_REF_LOW..TIME_REF_LOW + 4].copy_from_slice(&(time as u32).to_le_bytes());
    data[TIME_REF_HIGH..TIME_REF_HIGH + 4].copy_from_slice(&((time >> 32) as u32).to_le_bytes());

    let version = map.int_or(VERSION, 0) as u16;
    data[VERSION_OFFSET..VERSION_OFFSET + 2].copy_from_slice(&version.to_le_bytes());

    let umid = map.text(UMID);
    if umid.is_ascii() {
        let field = &mut data[UMID_FIELD.0..UMID_FIELD.1];
        for (dst, pair) in field.iter_mut().zip(umid.as_bytes().chunks_exact(2)) {
            let pair = std::str::from_utf8(pair).unwrap_or("00");
            *dst = u8::from_str_radix(pair, 16).unwrap_or(0);
        }
    }

    for (key, offset, _) in LOUDNESS_FIELDS {
        let raw = map.int_or(key, 0) as u16;
        data[offset..offset + 2].copy_from_slice(&raw.to_le_bytes());
    }

    data[BEXT_HEADER_SIZE..BEXT_HEADER_SIZE + history.len()].copy_from_slice(history.as_bytes());
    data
}

/// Builds the broadcast keys for a new recording.
///
/// `date` is `yyyy-mm-dd` and `time` is `hh:mm:ss`, local to the originator.
pub fn create_metadata(
    description: &str,
    originator: &str,
    originator_ref: &str,
    date: &str,
    time: &str,
    time_reference: u64,
    coding_history: &str,
) -> MetadataMap {
    let mut map = MetadataMap::new();
    map.set_value(DESCRIPTION, description);
    map.set_value(ORIGINATOR, originator);
    map.set_value(ORIGINATOR_REF, originator_ref);
    map.set_value(ORIGINATION_DATE, date);
    map.set_value(ORIGINATION_TIME, time);
    map.set_value(TIME_REFERENCE, time_reference);
    map.set_value(CODING_HISTORY, coding_history);
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> MetadataMap {
        let mut map = MetadataMap::new();
        map.set_value(DESCRIPTION, "Door slam, heavy oak");
        map.set_value(ORIGINATOR, "Field Recorder");
        map.set_value(ORIGINATOR_REF, "FR-0042");
        map.set_value(ORIGINATION_DATE, "2024-03-01");
        map.set_value(ORIGINATION_TIME, "12:30:00");
        map.set_value(TIME_REFERENCE, 5_000_000_000u64);
        map.set_value(CODING_HISTORY, "A=PCM,F=48000,W=24,M=stereo\r\n");
        map
    }

    #[test]
    fn test_round_trip() {
        let map = sample_map();
        let body = encode(&map);
        assert_eq!(body.len() % 2, 0);
        assert!(body.len() >= BEXT_HEADER_SIZE);

        let mut decoded = MetadataMap::new();
        decode(&body, &mut decoded);
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_time_reference_splits_into_halves() {
        let body = encode(&sample_map());
        let low = u32_at(&body, TIME_REF_LOW) as u64;
        let high = u32_at(&body, TIME_REF_HIGH) as u64;
        assert_eq!(high << 32 | low, 5_000_000_000);
    }

    #[test]
    fn test_empty_map_is_omitted() {
        assert!(encode(&MetadataMap::new()).is_empty());

        let mut map = MetadataMap::new();
        map.set_value(TIME_REFERENCE, 0);
        assert!(encode(&map).is_empty());

        map.set_value(ORIGINATOR_REF, "only a reference");
        assert!(!encode(&map).is_empty());
    }

    #[test]
    fn test_extended_fields_only_when_set() {
        let mut map = sample_map();
        map.set_value(VERSION, 2);
        map.set_value(UMID, "060A2B34".repeat(16));
        map.set_value(LOUDNESS_VALUE, -2300);
        map.set_value(LOUDNESS_RANGE, 800);
        map.set_value(MAX_TRUE_PEAK_LEVEL, -100);

        let mut decoded = MetadataMap::new();
        decode(&encode(&map), &mut decoded);
        assert_eq!(decoded.text(VERSION), "2");
        assert_eq!(decoded.text(UMID), "060A2B34".repeat(16));
        assert_eq!(decoded.text(LOUDNESS_VALUE), "-2300");
        assert_eq!(decoded.text(LOUDNESS_RANGE), "800");
        assert_eq!(decoded.text(MAX_TRUE_PEAK_LEVEL), "-100");
        assert!(!decoded.contains_key(MAX_MOMENTARY_LOUDNESS));

        let mut plain = MetadataMap::new();
        decode(&encode(&sample_map()), &mut plain);
        assert!(!plain.contains_key(VERSION));
        assert!(!plain.contains_key(UMID));
    }

    #[test]
    fn test_create_metadata_fills_every_broadcast_key() {
        let map = create_metadata(
            "Door slam, heavy oak",
            "Field Recorder",
            "FR-0042",
            "2024-03-01",
            "12:30:00",
            5_000_000_000,
            "A=PCM,F=48000,W=24,M=stereo\r\n",
        );
        assert_eq!(map, sample_map());

        let mut decoded = MetadataMap::new();
        decode(&encode(&map), &mut decoded);
        assert_eq!(decoded.text(ORIGINATION_DATE), "2024-03-01");
        assert_eq!(decoded.text(TIME_REFERENCE), "5000000000");
    }

    #[test]
    fn test_short_body_reads_as_zero_filled() {
        let mut map = MetadataMap::new();
        decode(b"Short", &mut map);
        assert_eq!(map.text(DESCRIPTION), "Short");
        assert_eq!(map.text(TIME_REFERENCE), "0");
        assert_eq!(map.text(CODING_HISTORY), "");
    }
}
