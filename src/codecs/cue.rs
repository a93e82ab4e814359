//! Cue point `cue ` chunk.

use std::collections::HashSet;

use crate::codecs::ChunkTag;
use crate::prelude::*;

pub const NUM_CUE_POINTS: &str = "NumCuePoints";

const CUE_SIZE: usize = 24;

const FIELDS: [&str; 6] = ["Identifier", "Order", "ChunkID", "ChunkStart", "BlockStart", "Offset"];

fn cue_key(index: usize, field: &str) -> String {
    format!("Cue{}{}", index, field)
}

/// One cue point record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueRecord {
    pub identifier: u32,
    pub order: u32,
    pub chunk_id: u32,
    pub chunk_start: u32,
    pub block_start: u32,
    pub offset: u32,
}

impl CueRecord {
    fn fields(&self) -> [u32; 6] {
        [
            self.identifier,
            self.order,
            self.chunk_id,
            self.chunk_start,
            self.block_start,
            self.offset,
        ]
    }
}

/// Decodes a `cue ` body, stopping at the first record that would run past
/// the chunk end.
pub fn decode(body: &[u8], map: &mut MetadataMap) {
    let num_cues = match body.get(0..4) {
        Some(bytes) => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        None => 0,
    };
    map.set_value(NUM_CUE_POINTS, num_cues);

    for index in 0..num_cues as usize {
        let start = 4 + index * CUE_SIZE;
        let Some(record) = body.get(start..start + CUE_SIZE) else {
            dprintln!("cue: point {} of {} runs past the chunk end", index, num_cues);
            break;
        };

        let mut cursor = Cursor::new(record);
        for field in FIELDS {
            let value = cursor.read_u32::<LittleEndian>().unwrap_or(0);
            map.set_value(cue_key(index, field), value);
        }
    }
}

/// Builds the cue records described by the map.
///
/// A missing `Order` takes the next free slot: one past the largest order
/// seen so far, starting at 0. `ChunkID` defaults to the `data` tag.
pub fn records(map: &MetadataMap) -> Vec<CueRecord> {
    let num_cues = map.int_or(NUM_CUE_POINTS, 0).max(0) as usize;
    let data_tag = ChunkTag::DATA.as_u32() as i64;
    let mut next_order: i64 = 0;

    (0..num_cues)
        .map(|i| {
            let get = |field: &str, default: i64| map.int_or(&cue_key(i, field), default);

            let order = get("Order", next_order);
            next_order = next_order.max(order) + 1;

            CueRecord {
                identifier: get("Identifier", 0) as u32,
                order: order as u32,
                chunk_id: get("ChunkID", data_tag) as u32,
                chunk_start: get("ChunkStart", 0) as u32,
                block_start: get("BlockStart", 0) as u32,
                offset: get("Offset", 0) as u32,
            }
        })
        .collect()
}

pub fn encode(map: &MetadataMap) -> Vec<u8> {
    let records = records(map);
    if records.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(4 + records.len() * CUE_SIZE);
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for record in &records {
        for value in record.fields() {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

/// Fails on the first cue identifier that appears twice.
pub fn check_unique_identifiers(map: &MetadataMap) -> WavResult<()> {
    let mut seen = HashSet::new();
    for record in records(map) {
        if !seen.insert(record.identifier) {
            return Err(WavError::DuplicateCueIdentifier(record.identifier));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue_map(identifiers: &[u32]) -> MetadataMap {
        let mut map = MetadataMap::new();
        map.set_value(NUM_CUE_POINTS, identifiers.len());
        for (i, id) in identifiers.iter().enumerate() {
            map.set_value(cue_key(i, "Identifier"), id);
            map.set_value(cue_key(i, "Offset"), 1000 * i);
        }
        map
    }

    #[test]
    fn test_orders_are_assigned_from_zero() {
        let records = records(&cue_map(&[1, 2, 3]));
        let orders: Vec<u32> = records.iter().map(|r| r.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(records.iter().all(|r| r.chunk_id == ChunkTag::DATA.as_u32()));
    }

    #[test]
    fn test_explicit_order_moves_the_running_maximum() {
        let mut map = cue_map(&[1, 2, 3]);
        map.set_value("Cue0Order", 5);
        let orders: Vec<u32> = records(&map).iter().map(|r| r.order).collect();
        assert_eq!(orders, vec![5, 6, 7]);
    }

    #[test]
    fn test_round_trip() {
        let body = encode(&cue_map(&[10, 20]));
        assert_eq!(body.len(), 4 + 2 * CUE_SIZE);

        let mut decoded = MetadataMap::new();
        decode(&body, &mut decoded);
        assert_eq!(decoded.text(NUM_CUE_POINTS), "2");
        assert_eq!(decoded.text("Cue1Identifier"), "20");
        assert_eq!(decoded.text("Cue1Order"), "1");
        assert_eq!(decoded.text("Cue1Offset"), "1000");
        assert_eq!(decoded.text("Cue0ChunkID"), "1635017060");
    }

    #[test]
    fn test_no_cues_means_no_chunk() {
        assert!(encode(&MetadataMap::new()).is_empty());
        assert!(encode(&cue_map(&[])).is_empty());
    }

    #[test]
    fn test_walk_is_bounded_by_chunk_end() {
        let mut body = encode(&cue_map(&[7]));
        body[0..4].copy_from_slice(&1000u32.to_le_bytes());

        let mut decoded = MetadataMap::new();
        decode(&body, &mut decoded);
        assert_eq!(decoded.text("Cue0Identifier"), "7");
        assert!(!decoded.contains_key("Cue1Identifier"));
    }

    #[test]
    fn test_duplicate_identifiers() {
        assert!(check_unique_identifiers(&cue_map(&[1, 2, 3])).is_ok());
        let err = check_unique_identifiers(&cue_map(&[1, 2, 1])).unwrap_err();
        assert!(matches!(err, WavError::DuplicateCueIdentifier(1)));
    }
}
