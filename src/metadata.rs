use std::collections::BTreeMap;

/// Key-ordered string metadata carried between callers and the chunk codecs.
pub type MetadataMap = BTreeMap<String, String>;

/// Marker key recording which container a metadata map was decoded from.
pub const METADATA_SOURCE: &str = "MetaDataSource";

/// Typed accessors over a [`MetadataMap`].
///
/// Numeric getters are lenient: leading whitespace and a sign are accepted,
/// parsing stops at the first non-digit, and text with no digits reads as 0.
/// A missing key yields the supplied default.
pub trait MetadataExt {
    fn text(&self, key: &str) -> &str;
    fn int_or(&self, key: &str, default: i64) -> i64;
    fn set_value(&mut self, key: impl Into<String>, value: impl ToString);

    fn u32_or(&self, key: &str, default: u32) -> u32 {
        self.int_or(key, default as i64) as u32
    }

    fn flag(&self, key: &str) -> bool {
        self.int_or(key, 0) != 0
    }
}

impl MetadataExt for MetadataMap {
    fn text(&self, key: &str) -> &str {
        self.get(key).map(String::as_str).unwrap_or("")
    }

    fn int_or(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(value) => parse_int_lenient(value),
            None => default,
        }
    }

    fn set_value(&mut self, key: impl Into<String>, value: impl ToString) {
        self.insert(key.into(), value.to_string());
    }
}

pub fn parse_int_lenient(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.wrapping_mul(10).wrapping_add((b - b'0') as i64);
    }

    if negative { -value } else { value }
}

/// Parses a float the same lenient way: unparseable text reads as 0.
pub fn parse_float_lenient(text: &str) -> f32 {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|&(i, c)| {
            let sign = (c == '-' || c == '+') && (i == 0 || text[..i].ends_with(['e', 'E']));
            !(c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || sign)
        })
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    text[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_integers() {
        assert_eq!(parse_int_lenient("42"), 42);
        assert_eq!(parse_int_lenient("  -7"), -7);
        assert_eq!(parse_int_lenient("12abc"), 12);
        assert_eq!(parse_int_lenient("abc"), 0);
        assert_eq!(parse_int_lenient(""), 0);
        assert_eq!(parse_int_lenient("4294967295"), 4294967295);
    }

    #[test]
    fn test_lenient_floats() {
        assert_eq!(parse_float_lenient("120.5"), 120.5);
        assert_eq!(parse_float_lenient("-1.5e2"), -150.0);
        assert_eq!(parse_float_lenient("98bpm"), 98.0);
        assert_eq!(parse_float_lenient("fast"), 0.0);
    }

    #[test]
    fn test_defaults_only_apply_to_missing_keys() {
        let mut map = MetadataMap::new();
        map.set_value("MidiUnityNote", "not a number");

        assert_eq!(map.int_or("MidiUnityNote", 60), 0);
        assert_eq!(map.int_or("Missing", 60), 60);
        assert_eq!(map.u32_or("Missing", 7), 7);
        assert_eq!(map.text("Missing"), "");
    }
}
