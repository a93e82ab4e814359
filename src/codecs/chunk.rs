use std::fmt;

use crate::prelude::*;

/// Size of a chunk header: tag + 32-bit length.
pub const CHUNK_HEADER_SIZE: u64 = 8;

/// A four-character RIFF chunk identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkTag(pub [u8; 4]);

impl ChunkTag {
    pub const RIFF: Self = Self(*b"RIFF");
    pub const RF64: Self = Self(*b"RF64");
    pub const WAVE: Self = Self(*b"WAVE");
    pub const DS64: Self = Self(*b"ds64");
    pub const JUNK: Self = Self(*b"JUNK");
    pub const FMT: Self = Self(*b"fmt ");
    pub const DATA: Self = Self(*b"data");
    pub const BEXT: Self = Self(*b"bext");
    pub const SMPL: Self = Self(*b"smpl");
    pub const INST: Self = Self(*b"inst");
    pub const INST_UPPER: Self = Self(*b"INST");
    pub const CUE: Self = Self(*b"cue ");
    pub const LIST: Self = Self(*b"LIST");
    pub const INFO: Self = Self(*b"INFO");
    pub const ADTL: Self = Self(*b"adtl");
    pub const LABL: Self = Self(*b"labl");
    pub const NOTE: Self = Self(*b"note");
    pub const LTXT: Self = Self(*b"ltxt");
    pub const ACID: Self = Self(*b"acid");
    pub const AXML: Self = Self(*b"axml");
    pub const IXML: Self = Self(*b"iXML");
    pub const TRKN: Self = Self(*b"Trkn");
    pub const ID3: Self = Self(*b"ID3 ");
    pub const ID3_LOWER: Self = Self(*b"id3 ");
    pub const PAD: Self = Self(*b"PAD ");
    pub const FLLR: Self = Self(*b"FLLR");

    /// Tag from its little-endian integer form.
    pub const fn from_u32(value: u32) -> Self {
        Self(value.to_le_bytes())
    }

    /// Little-endian integer form, as stored in cue `ChunkID` fields.
    pub const fn as_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Builds a tag from the first four bytes of `s`, space-padded.
    pub fn from_str_padded(s: &str) -> Self {
        let mut tag = [b' '; 4];
        for (dst, src) in tag.iter_mut().zip(s.bytes()) {
            *dst = src;
        }
        Self(tag)
    }

    /// Framing and filler chunks, which the writer always lays out itself.
    pub fn is_framing(self) -> bool {
        matches!(
            self,
            Self::RIFF | Self::RF64 | Self::WAVE | Self::DS64 | Self::FMT | Self::DATA
        ) || [Self::JUNK, Self::PAD, Self::FLLR]
            .iter()
            .any(|filler| filler.eq_ignore_ascii_case(self))
    }

    pub fn eq_ignore_ascii_case(self, other: Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut tag = [0u8; 4];
        reader.read_exact(&mut tag)?;
        Ok(Self(tag))
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkTag({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// Chunk bodies are stored at even lengths; the pad byte is not counted in
/// the declared length.
pub const fn round_up_even(n: u64) -> u64 {
    n + (n & 1)
}

/// A chunk header read from a stream, with the padded end of its body.
#[derive(Debug, Clone, Copy)]
pub struct ChunkHeader {
    pub tag: ChunkTag,
    pub length: u32,
    /// Stream position of the first body byte.
    pub body_start: u64,
}

impl ChunkHeader {
    pub fn read<R: Read + Seek>(reader: &mut R) -> std::io::Result<Self> {
        let tag = ChunkTag::read_from(reader)?;
        let length = reader.read_u32::<LittleEndian>()?;
        let body_start = reader.stream_position()?;
        Ok(Self {
            tag,
            length,
            body_start,
        })
    }

    /// Position just past the body and its pad byte.
    pub fn end(&self) -> u64 {
        self.body_start + round_up_even(self.length as u64)
    }
}

pub fn write_chunk_header<W: Write>(writer: &mut W, tag: ChunkTag, length: u32) -> std::io::Result<()> {
    writer.write_all(&tag.0)?;
    writer.write_u32::<LittleEndian>(length)
}

/// Writes tag, length, body and a zero pad byte when the body is odd-sized.
/// Empty bodies are omitted entirely.
pub fn write_chunk<W: Write>(writer: &mut W, tag: ChunkTag, body: &[u8]) -> std::io::Result<()> {
    if body.is_empty() {
        return Ok(());
    }
    write_chunk_header(writer, tag, body.len() as u32)?;
    writer.write_all(body)?;
    if body.len() % 2 == 1 {
        writer.write_all(&[0])?; // padding
    }
    Ok(())
}

/// Bytes [`write_chunk`] will emit for `body`, header and padding included.
pub fn chunk_size_on_disk(body: &[u8]) -> u64 {
    if body.is_empty() {
        0
    } else {
        CHUNK_HEADER_SIZE + round_up_even(body.len() as u64)
    }
}

/// Decodes a fixed-width text field: stops at the first NUL, lossy UTF-8.
pub fn text_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Copies `text` into a fixed-width field, truncating on a char boundary.
pub fn put_text_field(field: &mut [u8], text: &str) {
    let mut len = text.len().min(field.len());
    while !text.is_char_boundary(len) {
        len -= 1;
    }
    field[..len].copy_from_slice(&text.as_bytes()[..len]);
}

/// Appends `text` plus a NUL terminator, returning the terminated length.
pub fn push_terminated_text(out: &mut Vec<u8>, text: &str) -> usize {
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    text.len() + 1
}
