//! `LIST` chunks: `INFO` text tags and `adtl` cue labels, notes and regions.

use crate::codecs::ChunkTag;
use crate::codecs::chunk::{push_terminated_text, round_up_even, text_field};
use crate::prelude::*;

pub const NUM_CUE_LABELS: &str = "NumCueLabels";
pub const NUM_CUE_NOTES: &str = "NumCueNotes";
pub const NUM_CUE_REGIONS: &str = "NumCueRegions";

/// The RIFF INFO tags understood on read and write. Map keys are the codes
/// themselves.
pub const INFO_TAGS: [&str; 81] = [
    "IARL", // archival location
    "IART", // artist
    "IBSU", // base URL
    "ICNM", // cinematographer
    "CMNT", // comment
    "COMM", // comments
    "ICMT", // comment
    "ICMS", // commissioned
    "ICOP", // copyright
    "ICDS", // costume designer
    "ICNT", // country
    "ICRP", // cropped
    "ICRD", // date created
    "IDIT", // date/time original
    "ICAS", // default audio stream
    "IDIM", // dimension
    "DIRC", // directory
    "IDST", // distributed by
    "IDPI", // dots per inch
    "IEDT", // edited by
    "IAS8", // eighth language
    "CODE", // encoded by
    "TCDO", // end timecode
    "IENG", // engineer
    "IAS5", // fifth language
    "IAS1", // first language
    "IAS4", // fourth language
    "GENR", // genre
    "IKEY", // keywords
    "LANG", // language
    "TLEN", // length
    "ILGT", // lightness
    "LOCA", // location
    "ILIU", // logo icon URL
    "ILGU", // logo URL
    "IMED", // medium
    "IMBI", // more info banner image
    "IMBU", // more info banner URL
    "IMIT", // more info text
    "IMIU", // more info URL
    "IMUS", // music by
    "IAS9", // ninth language
    "PRT2", // number of parts
    "TORG", // organisation
    "PRT1", // part
    "IPRO", // produced by
    "IPRD", // product name
    "IPDS", // production designer
    "ISDT", // production studio
    "RATE", // rate
    "AGES", // rated
    "IRTD", // rating
    "IRIP", // ripped by
    "ISGN", // secondary genre
    "IAS2", // second language
    "IAS7", // seventh language
    "ISHP", // sharpness
    "IAS6", // sixth language
    "ISFT", // software
    "DISP", // sound scheme title
    "ISRC", // source
    "ISRF", // source from
    "ISTR", // starring
    "STAR", // starring
    "TCOD", // start timecode
    "STAT", // statistics
    "ISBJ", // subject
    "TAPE", // tape name
    "ITCH", // technician
    "IAS3", // third language
    "ISMP", // time code
    "INAM", // title
    "IPRT", // track number
    "TRCK", // track number
    "TURL", // URL
    "VMAJ", // Vegas major version
    "VMIN", // Vegas minor version
    "TVER", // version
    "IWMU", // watermark URL
    "IWRI", // written by
    "YEAR", // year
];

/// Running indices for `adtl` records. They persist across every `LIST`
/// chunk in a file so labels from separate lists don't collide.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdtlCounters {
    pub labels: u32,
    pub notes: u32,
    pub regions: u32,
}

impl AdtlCounters {
    /// Publishes the non-zero counts.
    pub fn write_counts(&self, map: &mut MetadataMap) {
        for (key, count) in [
            (NUM_CUE_LABELS, self.labels),
            (NUM_CUE_NOTES, self.notes),
            (NUM_CUE_REGIONS, self.regions),
        ] {
            if count > 0 {
                map.set_value(key, count);
            }
        }
    }
}

/// Walks the sub-chunks of a `LIST` body. Bodies are clamped to the end of
/// the list; a truncated sub-chunk header ends the walk.
fn sub_chunks(body: &[u8]) -> impl Iterator<Item = (ChunkTag, &[u8])> {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        let header = body.get(pos..pos.checked_add(8)?)?;
        let tag = ChunkTag([header[0], header[1], header[2], header[3]]);
        let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let start = pos + 8;
        let end = start.saturating_add(length).min(body.len());
        pos = start.saturating_add(round_up_even(length as u64) as usize);
        Some((tag, &body[start..end]))
    })
}

fn info_key(tag: ChunkTag) -> Option<&'static str> {
    INFO_TAGS
        .iter()
        .copied()
        .find(|code| tag.eq_ignore_ascii_case(ChunkTag::from_str_padded(code)))
}

/// Decodes the sub-chunks of a `LIST`/`INFO` body (the `INFO` type already
/// consumed). Unknown tags are skipped.
pub fn decode_info(body: &[u8], map: &mut MetadataMap) {
    for (tag, value) in sub_chunks(body) {
        match info_key(tag) {
            Some(key) => map.set_value(key, text_field(value)),
            None => dprintln!("LIST/INFO: skipping unknown tag '{}'", tag),
        }
    }
}

/// Decodes the sub-chunks of a `LIST`/`adtl` body.
pub fn decode_adtl(body: &[u8], map: &mut MetadataMap, counters: &mut AdtlCounters) {
    for (tag, record) in sub_chunks(body) {
        match tag {
            ChunkTag::LABL | ChunkTag::NOTE => {
                let prefix = if tag == ChunkTag::LABL {
                    counters.labels += 1;
                    format!("CueLabel{}", counters.labels - 1)
                } else {
                    counters.notes += 1;
                    format!("CueNote{}", counters.notes - 1)
                };

                let mut cursor = Cursor::new(record);
                let identifier = cursor.read_u32::<LittleEndian>().unwrap_or(0);
                let text = record.get(4..).unwrap_or_default();

                map.set_value(format!("{prefix}Identifier"), identifier);
                map.set_value(format!("{prefix}Text"), text_field(text));
            }
            ChunkTag::LTXT => {
                let prefix = format!("CueRegion{}", counters.regions);
                counters.regions += 1;

                let mut fixed = [0u8; 20];
                let available = record.len().min(20);
                fixed[..available].copy_from_slice(&record[..available]);
                let mut cursor = Cursor::new(&fixed[..]);

                for field in ["Identifier", "SampleLength", "Purpose"] {
                    let value = cursor.read_u32::<LittleEndian>().unwrap_or(0);
                    map.set_value(format!("{prefix}{field}"), value);
                }
                for field in ["Country", "Language", "Dialect", "CodePage"] {
                    let value = cursor.read_u16::<LittleEndian>().unwrap_or(0);
                    map.set_value(format!("{prefix}{field}"), value);
                }

                let text = record.get(20..).unwrap_or_default();
                map.set_value(format!("{prefix}Text"), text_field(text));
            }
            other => dprintln!("LIST/adtl: skipping '{}'", other),
        }
    }
}

/// Appends a sub-chunk whose declared length covers `fixed` plus the
/// NUL-terminated text; the pad byte is written but not counted.
fn push_text_record(out: &mut Vec<u8>, tag: ChunkTag, fixed: &[u8], text: &str) {
    let length = fixed.len() + text.len() + 1;
    out.extend_from_slice(&tag.0);
    out.extend_from_slice(&(length as u32).to_le_bytes());
    out.extend_from_slice(fixed);
    push_terminated_text(out, text);
    if length % 2 == 1 {
        out.push(0);
    }
}

/// Encodes a `LIST` body of type `adtl`, or nothing when no labels, notes or
/// regions are declared.
pub fn encode_adtl(map: &MetadataMap) -> Vec<u8> {
    let labels = map.int_or(NUM_CUE_LABELS, 0).max(0);
    let notes = map.int_or(NUM_CUE_NOTES, 0).max(0);
    let regions = map.int_or(NUM_CUE_REGIONS, 0).max(0);

    if labels + notes + regions == 0 {
        return Vec::new();
    }

    let mut out = ChunkTag::ADTL.0.to_vec();

    for (tag, name, count) in [(ChunkTag::LABL, "CueLabel", labels), (ChunkTag::NOTE, "CueNote", notes)] {
        for i in 0..count {
            let prefix = format!("{name}{i}");
            let identifier = map.int_or(&format!("{prefix}Identifier"), 0) as u32;
            let text = map.get(&format!("{prefix}Text")).unwrap_or(&prefix);
            push_text_record(&mut out, tag, &identifier.to_le_bytes(), text);
        }
    }

    for i in 0..regions {
        let prefix = format!("CueRegion{i}");
        let get = |field: &str| map.int_or(&format!("{prefix}{field}"), 0);

        let mut fixed = Vec::with_capacity(20);
        for field in ["Identifier", "SampleLength", "Purpose"] {
            fixed.extend_from_slice(&(get(field) as u32).to_le_bytes());
        }
        for field in ["Country", "Language", "Dialect", "CodePage"] {
            fixed.extend_from_slice(&(get(field) as u16).to_le_bytes());
        }

        let text = map.get(&format!("{prefix}Text")).unwrap_or(&prefix);
        push_text_record(&mut out, ChunkTag::LTXT, &fixed, text);
    }

    out
}

/// Encodes a `LIST` body of type `INFO`, or nothing when no tag has a value.
pub fn encode_info(map: &MetadataMap) -> Vec<u8> {
    let mut out = ChunkTag::INFO.0.to_vec();
    let mut any_written = false;

    for code in INFO_TAGS {
        let value = map.text(code);
        if !value.is_empty() {
            push_text_record(&mut out, ChunkTag::from_str_padded(code), &[], value);
            any_written = true;
        }
    }

    if any_written { out } else { Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_info_round_trip() {
        let mut map = MetadataMap::new();
        map.set_value("INAM", "Thunder");
        map.set_value("IART", "Foley Team");
        map.set_value("ICMT", "odd");

        let body = encode_info(&map);
        assert_eq!(&body[0..4], b"INFO");
        assert_eq!(body.len() % 2, 0);

        let mut decoded = MetadataMap::new();
        decode_info(&body[4..], &mut decoded);
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_info_declared_length_excludes_pad() {
        let mut map = MetadataMap::new();
        map.set_value("INAM", "abcd");

        let body = encode_info(&map);
        // "abcd" + NUL is 5 bytes, padded to 6 on disk.
        assert_eq!(&body[4..8], b"INAM");
        assert_eq!(u32::from_le_bytes([body[8], body[9], body[10], body[11]]), 5);
        assert_eq!(body.len(), 4 + 8 + 6);
    }

    #[test]
    fn test_info_lowercase_and_unknown_tags() {
        let mut body = Vec::new();
        push_text_record(&mut body, ChunkTag(*b"XXXX"), &[], "ignored");
        push_text_record(&mut body, ChunkTag(*b"inam"), &[], "Lower");
        push_text_record(&mut body, ChunkTag(*b"ICOP"), &[], "2024");

        let mut map = MetadataMap::new();
        decode_info(&body, &mut map);
        assert_eq!(map.len(), 2);
        assert_eq!(map.text("INAM"), "Lower");
        assert_eq!(map.text("ICOP"), "2024");
    }

    #[test]
    fn test_empty_info_is_omitted() {
        let mut map = MetadataMap::new();
        map.set_value("INAM", "");
        assert!(encode_info(&map).is_empty());
    }

    #[test]
    fn test_adtl_round_trip() {
        let mut map = MetadataMap::new();
        map.set_value(NUM_CUE_LABELS, 2);
        map.set_value("CueLabel0Identifier", 1);
        map.set_value("CueLabel0Text", "Intro");
        map.set_value("CueLabel1Identifier", 2);
        map.set_value(NUM_CUE_NOTES, 1);
        map.set_value("CueNote0Identifier", 1);
        map.set_value("CueNote0Text", "check levels");
        map.set_value(NUM_CUE_REGIONS, 1);
        map.set_value("CueRegion0Identifier", 2);
        map.set_value("CueRegion0SampleLength", 4410);
        map.set_value("CueRegion0Purpose", 0x6D677274u32);
        map.set_value("CueRegion0CodePage", 1252);
        map.set_value("CueRegion0Text", "Chorus");

        let body = encode_adtl(&map);
        assert_eq!(&body[0..4], b"adtl");

        let mut decoded = MetadataMap::new();
        let mut counters = AdtlCounters::default();
        decode_adtl(&body[4..], &mut decoded, &mut counters);
        counters.write_counts(&mut decoded);

        assert_eq!(decoded.text("CueLabel0Text"), "Intro");
        // A missing text defaults to the record prefix.
        assert_eq!(decoded.text("CueLabel1Text"), "CueLabel1");
        assert_eq!(decoded.text("CueNote0Text"), "check levels");
        assert_eq!(decoded.text("CueRegion0SampleLength"), "4410");
        assert_eq!(decoded.text("CueRegion0Purpose"), "1835496052");
        assert_eq!(decoded.text("CueRegion0Country"), "0");
        assert_eq!(decoded.text("CueRegion0CodePage"), "1252");
        assert_eq!(decoded.text("CueRegion0Text"), "Chorus");
        assert_eq!(decoded.text(NUM_CUE_LABELS), "2");
        assert_eq!(decoded.text(NUM_CUE_NOTES), "1");
        assert_eq!(decoded.text(NUM_CUE_REGIONS), "1");
    }

    #[test]
    fn test_counters_persist_across_lists() {
        let mut map = MetadataMap::new();
        map.set_value(NUM_CUE_LABELS, 1);
        map.set_value("CueLabel0Text", "first");
        let body = encode_adtl(&map);

        let mut decoded = MetadataMap::new();
        let mut counters = AdtlCounters::default();
        decode_adtl(&body[4..], &mut decoded, &mut counters);
        decode_adtl(&body[4..], &mut decoded, &mut counters);

        assert_eq!(counters.labels, 2);
        assert!(decoded.contains_key("CueLabel1Text"));
    }

    #[test]
    fn test_truncated_record_is_clamped() {
        let mut body = Vec::new();
        body.extend_from_slice(b"labl");
        body.extend_from_slice(&100u32.to_le_bytes());
        body.extend_from_slice(&9u32.to_le_bytes());
        body.extend_from_slice(b"cut");

        let mut map = MetadataMap::new();
        let mut counters = AdtlCounters::default();
        decode_adtl(&body, &mut map, &mut counters);
        assert_eq!(map.text("CueLabel0Identifier"), "9");
        assert_eq!(map.text("CueLabel0Text"), "cut");
    }

    #[test]
    fn test_no_counts_means_no_adtl() {
        assert!(encode_adtl(&MetadataMap::new()).is_empty());
    }
}
