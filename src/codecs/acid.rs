//! ACID loop chunk: tempo, beats and meter.

use crate::metadata::parse_float_lenient;
use crate::prelude::*;

pub const ONE_SHOT: &str = "acid one shot";
pub const ROOT_SET: &str = "acid root set";
pub const STRETCH: &str = "acid stretch";
pub const DISK_BASED: &str = "acid disk based";
pub const ACIDIZER: &str = "acidizer flag";
pub const ROOT_NOTE: &str = "acid root note";
pub const BEATS: &str = "acid beats";
pub const DENOMINATOR: &str = "acid denominator";
pub const NUMERATOR: &str = "acid numerator";
pub const TEMPO: &str = "acid tempo";

const ACID_SIZE: usize = 24;

const FLAGS: [(&str, u32); 5] = [
    (ONE_SHOT, 0x01),
    (ROOT_SET, 0x02),
    (STRETCH, 0x04),
    (DISK_BASED, 0x08),
    (ACIDIZER, 0x10),
];

const ROOT_SET_FLAG: u32 = 0x02;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AcidRecord {
    pub flags: u32,
    pub root_note: u16,
    pub num_beats: u32,
    pub meter_denominator: u16,
    pub meter_numerator: u16,
    pub tempo: f32,
}

impl AcidRecord {
    /// Reads the 24-byte layout; short bodies read as zero-filled.
    pub fn read(body: &[u8]) -> Self {
        let mut data = [0u8; ACID_SIZE];
        let available = body.len().min(ACID_SIZE);
        data[..available].copy_from_slice(&body[..available]);

        let mut cursor = Cursor::new(&data[..]);
        let mut read = || -> std::io::Result<Self> {
            let flags = cursor.read_u32::<LittleEndian>()?;
            let root_note = cursor.read_u16::<LittleEndian>()?;
            cursor.read_u16::<LittleEndian>()?; // reserved
            cursor.read_f32::<LittleEndian>()?; // reserved
            Ok(Self {
                flags,
                root_note,
                num_beats: cursor.read_u32::<LittleEndian>()?,
                meter_denominator: cursor.read_u16::<LittleEndian>()?,
                meter_numerator: cursor.read_u16::<LittleEndian>()?,
                tempo: cursor.read_f32::<LittleEndian>()?,
            })
        };
        read().unwrap_or_default()
    }

    pub fn from_map(map: &MetadataMap) -> Self {
        let flags = FLAGS
            .iter()
            .filter(|(key, _)| map.flag(key))
            .fold(0, |flags, (_, bit)| flags | bit);

        let root_note = if map.flag(ROOT_SET) {
            map.int_or(ROOT_NOTE, 0) as u16
        } else {
            0
        };

        Self {
            flags,
            root_note,
            num_beats: map.int_or(BEATS, 0) as u32,
            meter_denominator: map.int_or(DENOMINATOR, 0) as u16,
            meter_numerator: map.int_or(NUMERATOR, 0) as u16,
            tempo: map.get(TEMPO).map_or(0.0, |t| parse_float_lenient(t)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flags == 0
            && self.root_note == 0
            && self.num_beats == 0
            && self.meter_denominator == 0
            && self.meter_numerator == 0
            && self.tempo == 0.0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ACID_SIZE);
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.root_note.to_le_bytes());
        out.extend_from_slice(&[0; 6]); // reserved
        out.extend_from_slice(&self.num_beats.to_le_bytes());
        out.extend_from_slice(&self.meter_denominator.to_le_bytes());
        out.extend_from_slice(&self.meter_numerator.to_le_bytes());
        out.extend_from_slice(&self.tempo.to_le_bytes());
        out
    }
}

pub fn decode(body: &[u8], map: &mut MetadataMap) {
    let record = AcidRecord::read(body);

    for (key, bit) in FLAGS {
        map.set_value(key, if record.flags & bit != 0 { "1" } else { "0" });
    }
    if record.flags & ROOT_SET_FLAG != 0 {
        map.set_value(ROOT_NOTE, record.root_note);
    }

    map.set_value(BEATS, record.num_beats);
    map.set_value(DENOMINATOR, record.meter_denominator);
    map.set_value(NUMERATOR, record.meter_numerator);
    map.set_value(TEMPO, record.tempo);
}

pub fn encode(map: &MetadataMap) -> Vec<u8> {
    let record = AcidRecord::from_map(map);
    if record.is_empty() {
        Vec::new()
    } else {
        record.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut map = MetadataMap::new();
        map.set_value(ONE_SHOT, "0");
        map.set_value(ROOT_SET, "1");
        map.set_value(STRETCH, "1");
        map.set_value(DISK_BASED, "0");
        map.set_value(ACIDIZER, "0");
        map.set_value(ROOT_NOTE, 57);
        map.set_value(BEATS, 8);
        map.set_value(DENOMINATOR, 4);
        map.set_value(NUMERATOR, 4);
        map.set_value(TEMPO, 120.5);

        let body = encode(&map);
        assert_eq!(body.len(), ACID_SIZE);
        assert_eq!(body[0], 0x06);

        let mut decoded = MetadataMap::new();
        decode(&body, &mut decoded);
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_root_note_needs_root_set() {
        let mut map = MetadataMap::new();
        map.set_value(ROOT_NOTE, 60);
        map.set_value(BEATS, 4);

        let record = AcidRecord::from_map(&map);
        assert_eq!(record.root_note, 0);

        let mut decoded = MetadataMap::new();
        decode(&record.to_bytes(), &mut decoded);
        assert!(!decoded.contains_key(ROOT_NOTE));
        assert_eq!(decoded.text(TEMPO), "0");
    }

    #[test]
    fn test_all_zero_is_omitted() {
        let mut map = MetadataMap::new();
        map.set_value(ONE_SHOT, "0");
        map.set_value(TEMPO, "0");
        assert!(encode(&map).is_empty());

        map.set_value(TEMPO, "98");
        assert_eq!(encode(&map).len(), ACID_SIZE);
    }
}
