use crate::prelude::*;

pub mod acid;
pub mod axml;
pub mod bext;
pub mod chunk;
pub mod cue;
pub mod format;
pub mod inst;
pub mod list;
pub mod passthrough;
pub mod samples;
pub mod smpl;
pub mod wav;

pub use chunk::{ChunkHeader, ChunkTag};
pub use format::{AudioGeometry, ChannelLayout, ChannelRole, FormatChunk};
pub use samples::{Levels, SampleBuffer, SampleFormat};
pub use wav::{
    MappedWavReader, POSSIBLE_BIT_DEPTHS, POSSIBLE_SAMPLE_RATES, WavHeader, WavReader, WavWriter,
    WriterOptions, is_channel_layout_supported,
};

use list::AdtlCounters;

/// Value of the `MetaDataSource` key for maps decoded here.
const WAV_SOURCE: &str = "WAV";

/// Metadata chunk kinds this codec reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataChunk {
    Bext,
    Axml,
    Smpl,
    Inst,
    Cue,
    /// `LIST` of type `adtl`: cue labels, notes and regions.
    AssociatedData,
    /// `LIST` of type `INFO`.
    Info,
    Acid,
    Tracktion,
    IXml,
    Id3,
}

impl MetadataChunk {
    /// The order chunks are written in.
    pub const WRITE_ORDER: [MetadataChunk; 11] = [
        MetadataChunk::Bext,
        MetadataChunk::Axml,
        MetadataChunk::Smpl,
        MetadataChunk::Inst,
        MetadataChunk::Cue,
        MetadataChunk::AssociatedData,
        MetadataChunk::Info,
        MetadataChunk::Acid,
        MetadataChunk::Tracktion,
        MetadataChunk::IXml,
        MetadataChunk::Id3,
    ];

    pub fn tag(&self) -> ChunkTag {
        match self {
            MetadataChunk::Bext => ChunkTag::BEXT,
            MetadataChunk::Axml => ChunkTag::AXML,
            MetadataChunk::Smpl => ChunkTag::SMPL,
            MetadataChunk::Inst => ChunkTag::INST,
            MetadataChunk::Cue => ChunkTag::CUE,
            MetadataChunk::AssociatedData | MetadataChunk::Info => ChunkTag::LIST,
            MetadataChunk::Acid => ChunkTag::ACID,
            MetadataChunk::Tracktion => ChunkTag::TRKN,
            MetadataChunk::IXml => ChunkTag::IXML,
            MetadataChunk::Id3 => ChunkTag::ID3,
        }
    }

    /// Identifies a chunk from its tag, peeking at the list type for `LIST`.
    pub fn identify(tag: ChunkTag, body: &[u8]) -> Option<Self> {
        match tag {
            ChunkTag::BEXT => Some(MetadataChunk::Bext),
            ChunkTag::AXML => Some(MetadataChunk::Axml),
            ChunkTag::SMPL => Some(MetadataChunk::Smpl),
            ChunkTag::INST | ChunkTag::INST_UPPER => Some(MetadataChunk::Inst),
            ChunkTag::CUE => Some(MetadataChunk::Cue),
            ChunkTag::ACID => Some(MetadataChunk::Acid),
            ChunkTag::TRKN => Some(MetadataChunk::Tracktion),
            ChunkTag::IXML => Some(MetadataChunk::IXml),
            ChunkTag::ID3 | ChunkTag::ID3_LOWER => Some(MetadataChunk::Id3),
            ChunkTag::LIST => {
                let list_type = ChunkTag(body.get(0..4)?.try_into().ok()?);
                if list_type.eq_ignore_ascii_case(ChunkTag::INFO) {
                    Some(MetadataChunk::Info)
                } else if list_type == ChunkTag::ADTL {
                    Some(MetadataChunk::AssociatedData)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Encodes this chunk's body from the map. An empty body means the chunk
    /// is omitted.
    pub fn encode(&self, map: &MetadataMap) -> Vec<u8> {
        match self {
            MetadataChunk::Bext => bext::encode(map),
            MetadataChunk::Axml => axml::encode(map),
            MetadataChunk::Smpl => smpl::encode(map),
            MetadataChunk::Inst => inst::encode(map),
            MetadataChunk::Cue => cue::encode(map),
            MetadataChunk::AssociatedData => list::encode_adtl(map),
            MetadataChunk::Info => list::encode_info(map),
            MetadataChunk::Acid => acid::encode(map),
            MetadataChunk::Tracktion => passthrough::encode_trkn(map),
            MetadataChunk::IXml => passthrough::encode_ixml(map),
            MetadataChunk::Id3 => passthrough::encode_id3(map),
        }
    }
}

/// Encodes every non-empty metadata chunk, in write order.
pub fn encode_metadata_chunks(map: &MetadataMap) -> Vec<(ChunkTag, Vec<u8>)> {
    MetadataChunk::WRITE_ORDER
        .iter()
        .map(|kind| (kind.tag(), kind.encode(map)))
        .filter(|(_, body)| !body.is_empty())
        .collect()
}

/// Accumulates metadata across all chunks of one file.
#[derive(Debug, Default)]
pub struct MetadataDecoder {
    map: MetadataMap,
    adtl: AdtlCounters,
}

impl MetadataDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one chunk body into the map. Returns the kind when the tag was
    /// recognized.
    pub fn decode_chunk(&mut self, tag: ChunkTag, body: &[u8]) -> Option<MetadataChunk> {
        let kind = MetadataChunk::identify(tag, body)?;
        let map = &mut self.map;

        match kind {
            MetadataChunk::Bext => bext::decode(body, map),
            MetadataChunk::Axml => axml::decode(body, map),
            MetadataChunk::Smpl => smpl::decode(body, map),
            MetadataChunk::Inst => inst::decode(body, map),
            MetadataChunk::Cue => cue::decode(body, map),
            MetadataChunk::AssociatedData => list::decode_adtl(&body[4..], map, &mut self.adtl),
            MetadataChunk::Info => list::decode_info(&body[4..], map),
            MetadataChunk::Acid => acid::decode(body, map),
            MetadataChunk::Tracktion => passthrough::decode_trkn(body, map),
            MetadataChunk::IXml => passthrough::decode_ixml(body, map),
            MetadataChunk::Id3 => passthrough::decode_id3(body, map),
        }

        Some(kind)
    }

    pub fn map_mut(&mut self) -> &mut MetadataMap {
        &mut self.map
    }

    /// Publishes the `adtl` counts and the source marker.
    pub fn finish(mut self) -> MetadataMap {
        self.adtl.write_counts(&mut self.map);
        if !self.map.is_empty() {
            self.map.set_value(crate::metadata::METADATA_SOURCE, WAV_SOURCE);
        }
        self.map
    }
}
