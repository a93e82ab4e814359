//! `axml` chunk: EBUCore XML, of which only the ISRC identifier is mapped.

use quick_xml::{Reader, events::Event};

use crate::codecs::chunk::text_field;
use crate::prelude::*;

pub const ISRC: &str = "ISRC";

const IDENTIFIER_PATH: [&str; 4] = [
    "ebucore:ebuCoreMain",
    "ebucore:coreMetadata",
    "ebucore:identifier",
    "dc:identifier",
];

pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Text of the first `dc:identifier` under the EBUCore identifier path.
fn find_identifier(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                if path.len() == IDENTIFIER_PATH.len() && path.iter().eq(IDENTIFIER_PATH.iter()) {
                    return Some(text);
                }
                path.pop();
            }
            Ok(Event::Text(ref e)) if path.len() >= IDENTIFIER_PATH.len() => {
                if path[..IDENTIFIER_PATH.len()].iter().eq(IDENTIFIER_PATH.iter()) {
                    if let Ok(unescaped) = e.unescape() {
                        text.push_str(&unescaped);
                    }
                }
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                dprintln!("axml: XML parse error: {}", e);
                return None;
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Maps the ISRC from an EBUCore document. The `ISRC:` prefix is matched
/// case-insensitively and everything after it becomes the value.
pub fn decode(body: &[u8], map: &mut MetadataMap) {
    let xml = text_field(body);
    let Some(identifier) = find_identifier(&xml) else {
        return;
    };

    let Some(start) = identifier.to_ascii_uppercase().find("ISRC:") else {
        return;
    };

    let code = &identifier[start + "ISRC:".len()..];
    if !code.is_empty() {
        map.set_value(ISRC, code);
    }
}

/// A minimal EBUCore document carrying the ISRC, or nothing without one.
pub fn encode(map: &MetadataMap) -> Vec<u8> {
    let isrc = map.text(ISRC);
    if isrc.is_empty() {
        return Vec::new();
    }

    format!(
        concat!(
            "<ebucore:ebuCoreMain xmlns:dc=\"http://purl.org/dc/elements/1.1/\" ",
            "xmlns:ebucore=\"urn:ebu:metadata-schema:ebuCore_2012\">",
            "<ebucore:coreMetadata>",
            "<ebucore:identifier typeLabel=\"GUID\" ",
            "typeDefinition=\"Globally Unique Identifier\" ",
            "formatLabel=\"ISRC\" ",
            "formatDefinition=\"International Standard Recording Code\" ",
            "formatLink=\"http://www.ebu.ch/metadata/cs/ebu_IdentifierTypeCodeCS.xml#3.7\">",
            "<dc:identifier>ISRC:{}</dc:identifier>",
            "</ebucore:identifier>",
            "</ebucore:coreMetadata>",
            "</ebucore:ebuCoreMain>"
        ),
        xml_escape(isrc)
    )
    .into_bytes()
}
