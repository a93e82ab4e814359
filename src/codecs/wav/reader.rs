use std::io::ErrorKind;

use crate::codecs::format::FORMAT_EXTENSIBLE;
use crate::codecs::{
    AudioGeometry, ChannelLayout, ChunkHeader, ChunkTag, FormatChunk, MetadataChunk,
    MetadataDecoder, SampleBuffer, SampleFormat, samples,
};
use crate::prelude::*;

pub const CHANNEL_MASK: &str = "ChannelMask";

const DS64_MIN_SIZE: u32 = 28;

/// Location of the audio in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataExtent {
    /// Stream offset of the first audio byte.
    pub start_offset: u64,
    pub byte_length: u64,
    pub sample_count: u64,
}

/// Everything learned from walking a WAV stream's chunks.
#[derive(Debug, Clone, Default)]
pub struct WavHeader {
    pub format: FormatChunk,
    pub data: DataExtent,
    pub metadata: MetadataMap,
    pub is_rf64: bool,
    /// Chunks with no metadata mapping, kept raw in file order so a rewrite
    /// can carry them over.
    pub extra_chunks: Vec<(ChunkTag, Vec<u8>)>,
    /// Stream position the walk started from.
    pub stream_start: u64,
}

fn read_tag_or_not_wav<R: Read>(reader: &mut R) -> WavResult<ChunkTag> {
    match ChunkTag::read_from(reader) {
        Ok(tag) => Ok(tag),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(WavError::NotThisFormat),
        Err(e) => Err(e.into()),
    }
}

impl WavHeader {
    pub fn geometry(&self) -> &AudioGeometry {
        &self.format.geometry
    }

    /// The channel layout from the extensible `fmt ` chunk, or the
    /// conventional layout for the channel count.
    pub fn layout(&self) -> ChannelLayout {
        self.format
            .layout
            .clone()
            .unwrap_or_else(|| ChannelLayout::canonical(self.format.geometry.channels))
    }

    /// Walks the chunks of a RIFF/RF64 WAVE stream from its current position.
    ///
    /// Malformed metadata chunks are logged and skipped. An Ogg Vorbis
    /// sub-format rewinds the stream to where the walk began and returns
    /// [`WavError::UnsupportedSubformat`].
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> WavResult<WavHeader> {
        let stream_start = reader.stream_position()?;
        let mut header = WavHeader {
            stream_start,
            ..Default::default()
        };

        let mut container_end = match read_tag_or_not_wav(reader)? {
            ChunkTag::RIFF => {
                let size = reader.read_u32::<LittleEndian>()? as u64;
                size + reader.stream_position()?
            }
            ChunkTag::RF64 => {
                reader.read_u32::<LittleEndian>()?; // 0xFFFFFFFF, real size is in ds64
                header.is_rf64 = true;
                0
            }
            _ => return Err(WavError::NotThisFormat),
        };
        let riff_start = reader.stream_position()?;

        if read_tag_or_not_wav(reader)? != ChunkTag::WAVE {
            return Err(WavError::NotThisFormat);
        }

        if header.is_rf64 {
            let ds64 = ChunkHeader::read(reader).map_err(|_| WavError::MissingDataSize)?;
            if ds64.tag != ChunkTag::DS64 || ds64.length < DS64_MIN_SIZE {
                return Err(WavError::MissingDataSize);
            }

            let riff_size = reader.read_u64::<LittleEndian>()?;
            header.data.byte_length = reader.read_u64::<LittleEndian>()?;
            reader.read_u64::<LittleEndian>()?; // sample count, recomputed from the data size
            container_end = riff_start.saturating_add(riff_size);
            reader.seek(SeekFrom::Start(ds64.end()))?;
        }

        let mut decoder = MetadataDecoder::new();
        let mut data_found = false;

        while reader.stream_position()? < container_end {
            let chunk = match ChunkHeader::read(reader) {
                Ok(chunk) => chunk,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            let chunk_end = chunk.end();

            match chunk.tag {
                ChunkTag::FMT => {
                    let body = read_body(reader, &chunk, container_end)?;
                    match FormatChunk::decode(&body) {
                        Ok(format) => {
                            if let Some(mask) = format.geometry.channel_mask {
                                decoder.map_mut().set_value(CHANNEL_MASK, mask);
                            }
                            header.format = format;
                        }
                        Err(e @ WavError::UnsupportedSubformat { .. }) => {
                            dprintln!("WAV: {}, handing the stream back", e);
                            reader.seek(SeekFrom::Start(stream_start))?;
                            return Err(e);
                        }
                        Err(e) => tracing::warn!("{}", e),
                    }
                }
                ChunkTag::DATA => {
                    if !header.is_rf64 {
                        header.data.byte_length = chunk.length as u64;
                    }
                    header.data.start_offset = chunk.body_start;
                    data_found = true;
                }
                tag if tag == ChunkTag::LIST || MetadataChunk::identify(tag, &[]).is_some() => {
                    let body = read_body(reader, &chunk, container_end)?;
                    if decoder.decode_chunk(tag, &body).is_none() {
                        dprintln!("WAV: keeping unrecognized LIST ({} bytes)", body.len());
                        header.extra_chunks.push((tag, body));
                    }
                }
                other if other.is_framing() => {
                    dprintln!("WAV: skipping '{}' chunk ({} bytes)", other, chunk.length)
                }
                other => {
                    let body = read_body(reader, &chunk, container_end)?;
                    dprintln!("WAV: keeping '{}' chunk ({} bytes)", other, body.len());
                    header.extra_chunks.push((other, body));
                }
            }

            reader.seek(SeekFrom::Start(chunk_end))?;
        }

        if !data_found {
            dprintln!("WAV: no data chunk found");
        }

        let bytes_per_frame = header.format.geometry.bytes_per_frame as u64;
        header.data.sample_count = header.data.byte_length.checked_div(bytes_per_frame).unwrap_or(0);
        header.metadata = decoder.finish();

        Ok(header)
    }
}

/// Reads a chunk body, clamped to the container end and to whatever the
/// stream still holds.
fn read_body<R: Read + Seek>(reader: &mut R, chunk: &ChunkHeader, container_end: u64) -> WavResult<Vec<u8>> {
    let mut length = chunk.length as u64;
    if chunk.body_start + length > container_end {
        let clamped = container_end.saturating_sub(chunk.body_start);
        tracing::warn!(
            "{}",
            WavError::malformed(
                chunk.tag,
                format!("{} byte body runs past the container, clamped to {}", length, clamped)
            )
        );
        length = clamped;
    }

    let mut body = Vec::new();
    reader.by_ref().take(length).read_to_end(&mut body)?;
    if (body.len() as u64) < length {
        tracing::warn!(
            "{}",
            WavError::malformed(chunk.tag, format!("stream ended {} bytes into the body", body.len()))
        );
    }
    Ok(body)
}

/// Sample reader over a seekable stream.
pub struct WavReader<R> {
    source: R,
    header: WavHeader,
    sample_format: SampleFormat,
}

impl<R: Read + Seek> WavReader<R> {
    pub fn open(mut source: R) -> WavResult<Self> {
        let header = WavHeader::read_from(&mut source)?;
        Self::from_header(source, header)
    }

    /// Wraps an already-decoded header, checking that its samples are readable.
    pub fn from_header(source: R, header: WavHeader) -> WavResult<Self> {
        let sample_format = readable_format(&header)?;
        Ok(Self {
            source,
            header,
            sample_format,
        })
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    pub fn geometry(&self) -> &AudioGeometry {
        self.header.geometry()
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.header.metadata
    }

    pub fn layout(&self) -> ChannelLayout {
        self.header.layout()
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    /// Length in frames.
    pub fn len(&self) -> u64 {
        self.header.data.sample_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads `frames` frames starting at `start`. Frames past the end of the
    /// data read as silence.
    pub fn read_samples(&mut self, start: u64, frames: usize) -> WavResult<SampleBuffer> {
        let channels = self.geometry().channels as usize;
        let bytes_per_frame = self.geometry().bytes_per_frame as u64;
        let available = self.len().saturating_sub(start).min(frames as u64);

        let mut bytes = Vec::with_capacity((available * bytes_per_frame) as usize);
        if available > 0 {
            let offset = self.header.data.start_offset + start * bytes_per_frame;
            self.source.seek(SeekFrom::Start(offset))?;
            self.source
                .by_ref()
                .take(available * bytes_per_frame)
                .read_to_end(&mut bytes)?;
        }

        Ok(samples::decode_interleaved(
            &bytes,
            channels,
            self.sample_format,
            frames,
        ))
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

/// The on-disk sample format, or why the header's audio can't be read.
pub(crate) fn readable_format(header: &WavHeader) -> WavResult<SampleFormat> {
    if header.format.unknown_subformat {
        return Err(WavError::UnsupportedSubformat {
            format_tag: FORMAT_EXTENSIBLE,
        });
    }

    let geometry = header.geometry();
    let unusable = || WavError::UnsupportedFormat {
        reason: format!(
            "format 0x{:04X}, {} channels, {} Hz, {} bits, {} bytes per frame",
            header.format.format_tag,
            geometry.channels,
            geometry.sample_rate,
            geometry.bits_per_sample,
            geometry.bytes_per_frame
        ),
    };

    if !geometry.is_usable() {
        return Err(unusable());
    }

    let format = geometry.sample_format()?;
    if geometry.bytes_per_frame as usize != geometry.channels as usize * format.bytes_per_sample() {
        return Err(unusable());
    }
    Ok(format)
}
