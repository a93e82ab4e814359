//! Sampler `smpl` chunk: MIDI tuning plus loop points.

use crate::prelude::*;

pub const NUM_SAMPLE_LOOPS: &str = "NumSampleLoops";
pub const MIDI_UNITY_NOTE: &str = "MidiUnityNote";

const HEADER_SIZE: usize = 36;
const LOOP_SIZE: usize = 24;
pub const MAX_LOOPS: i64 = 64;

/// Header fields in on-disk order, with their encode defaults.
const HEADER_FIELDS: [(&str, i64); 9] = [
    ("Manufacturer", 0),
    ("Product", 0),
    ("SamplePeriod", 0),
    (MIDI_UNITY_NOTE, 60),
    ("MidiPitchFraction", 0),
    ("SmpteFormat", 0),
    ("SmpteOffset", 0),
    (NUM_SAMPLE_LOOPS, 0),
    ("SamplerData", 0),
];

const LOOP_FIELDS: [&str; 6] = ["Identifier", "Type", "Start", "End", "Fraction", "PlayCount"];

fn loop_key(index: usize, field: &str) -> String {
    format!("Loop{}{}", index, field)
}

/// Decodes a `smpl` body. Loops are read only while a whole record fits in
/// the body, whatever `NumSampleLoops` claims.
pub fn decode(body: &[u8], map: &mut MetadataMap) {
    let mut header = [0u8; HEADER_SIZE];
    let available = body.len().min(HEADER_SIZE);
    header[..available].copy_from_slice(&body[..available]);

    let mut cursor = Cursor::new(&header[..]);
    let mut num_loops = 0;
    for (key, _) in HEADER_FIELDS {
        let value = cursor.read_u32::<LittleEndian>().unwrap_or(0);
        if key == NUM_SAMPLE_LOOPS {
            num_loops = value;
        }
        map.set_value(key, value);
    }

    for index in 0..num_loops as usize {
        let start = HEADER_SIZE + index * LOOP_SIZE;
        let Some(record) = body.get(start..start + LOOP_SIZE) else {
            dprintln!("smpl: loop {} of {} runs past the chunk end", index, num_loops);
            break;
        };

        let mut cursor = Cursor::new(record);
        for field in LOOP_FIELDS {
            let value = cursor.read_u32::<LittleEndian>().unwrap_or(0);
            map.set_value(loop_key(index, field), value);
        }
    }
}

/// Encodes a `smpl` body. The chunk is omitted unless loops or sampler
/// header values are present; `MidiUnityNote` alone is left to `inst`.
pub fn encode(map: &MetadataMap) -> Vec<u8> {
    let wanted = HEADER_FIELDS
        .iter()
        .any(|(key, _)| *key != MIDI_UNITY_NOTE && map.contains_key(*key));
    if !wanted {
        return Vec::new();
    }

    let num_loops = map.int_or(NUM_SAMPLE_LOOPS, 0).clamp(0, MAX_LOOPS) as usize;
    let mut out = Vec::with_capacity(HEADER_SIZE + num_loops * LOOP_SIZE);

    for (key, default) in HEADER_FIELDS {
        let value = if key == NUM_SAMPLE_LOOPS {
            num_loops as u32
        } else {
            map.int_or(key, default) as u32
        };
        out.extend_from_slice(&value.to_le_bytes());
    }

    for index in 0..num_loops {
        for field in LOOP_FIELDS {
            let value = map.int_or(&loop_key(index, field), 0) as u32;
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map_with_loops(count: usize) -> MetadataMap {
        let mut map = MetadataMap::new();
        map.set_value("Manufacturer", 71);
        map.set_value(MIDI_UNITY_NOTE, 64);
        map.set_value(NUM_SAMPLE_LOOPS, count);
        for i in 0..count {
            map.set_value(loop_key(i, "Identifier"), i);
            map.set_value(loop_key(i, "Start"), 100 * i);
            map.set_value(loop_key(i, "End"), 100 * i + 99);
        }
        map
    }

    #[test]
    fn test_round_trip_with_loops() {
        let body = encode(&map_with_loops(2));
        assert_eq!(body.len(), HEADER_SIZE + 2 * LOOP_SIZE);

        let mut decoded = MetadataMap::new();
        decode(&body, &mut decoded);
        assert_eq!(decoded.text("Manufacturer"), "71");
        assert_eq!(decoded.text(MIDI_UNITY_NOTE), "64");
        assert_eq!(decoded.text("SamplePeriod"), "0");
        assert_eq!(decoded.text("Loop1Start"), "100");
        assert_eq!(decoded.text("Loop1End"), "199");
        assert_eq!(decoded.text("Loop0PlayCount"), "0");
    }

    #[test]
    fn test_loop_count_is_clamped() {
        let mut map = MetadataMap::new();
        map.set_value(NUM_SAMPLE_LOOPS, 1000);
        let body = encode(&map);
        assert_eq!(body.len(), HEADER_SIZE + 64 * LOOP_SIZE);
        assert_eq!(u32::from_le_bytes([body[28], body[29], body[30], body[31]]), 64);

        map.set_value(NUM_SAMPLE_LOOPS, -3);
        assert_eq!(encode(&map).len(), HEADER_SIZE);
    }

    #[test]
    fn test_unity_note_alone_is_not_a_sampler_chunk() {
        let mut map = MetadataMap::new();
        map.set_value(MIDI_UNITY_NOTE, 60);
        assert!(encode(&map).is_empty());
    }

    #[test]
    fn test_loop_walk_is_bounded_by_chunk_end() {
        let mut body = encode(&map_with_loops(1));
        // Claim 50 loops while only one is present.
        body[28..32].copy_from_slice(&50u32.to_le_bytes());

        let mut decoded = MetadataMap::new();
        decode(&body, &mut decoded);
        assert_eq!(decoded.text(NUM_SAMPLE_LOOPS), "50");
        assert!(decoded.contains_key("Loop0End"));
        assert!(!decoded.contains_key("Loop1Identifier"));
    }
}
