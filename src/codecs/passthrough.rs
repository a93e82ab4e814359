//! Chunks carried through as single opaque values: `Trkn`, `iXML` and `ID3 `.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::prelude::*;

pub const TRACKTION_LOOP_INFO: &str = "tracktion loop info";
pub const IXML: &str = "iXML";
pub const ID3: &str = "ID3";

fn trim_trailing_nuls(body: &[u8]) -> &[u8] {
    let end = body.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &body[..end]
}

pub fn decode_trkn(body: &[u8], map: &mut MetadataMap) {
    let text = String::from_utf8_lossy(trim_trailing_nuls(body));
    map.set_value(TRACKTION_LOOP_INFO, text);
}

/// NUL-terminated loop info; `write_chunk` adds the pad byte.
pub fn encode_trkn(map: &MetadataMap) -> Vec<u8> {
    let info = map.text(TRACKTION_LOOP_INFO);
    if info.is_empty() {
        return Vec::new();
    }
    let mut out = info.as_bytes().to_vec();
    out.push(0);
    out
}

pub fn decode_ixml(body: &[u8], map: &mut MetadataMap) {
    let text = String::from_utf8_lossy(trim_trailing_nuls(body));
    map.set_value(IXML, text);
}

pub fn encode_ixml(map: &MetadataMap) -> Vec<u8> {
    map.text(IXML).as_bytes().to_vec()
}

/// ID3 tags are binary, so the map holds them base64-encoded.
pub fn decode_id3(body: &[u8], map: &mut MetadataMap) {
    map.set_value(ID3, STANDARD.encode(body));
}

pub fn encode_id3(map: &MetadataMap) -> Vec<u8> {
    let encoded = map.text(ID3);
    if encoded.is_empty() {
        return Vec::new();
    }
    match STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("dropping ID3 value that is not valid base64: {}", e);
            Vec::new()
        }
    }
}
