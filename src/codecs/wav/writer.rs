use crate::codecs::chunk::{
    CHUNK_HEADER_SIZE, chunk_size_on_disk, round_up_even, write_chunk, write_chunk_header,
};
use crate::codecs::format::encode_fmt;
use crate::codecs::wav::{POSSIBLE_BIT_DEPTHS, RF64_THRESHOLD, is_channel_layout_supported};
use crate::codecs::{
    AudioGeometry, ChannelLayout, ChunkTag, SampleBuffer, SampleFormat, cue,
    encode_metadata_chunks, samples,
};
use crate::prelude::*;

/// Bytes from `RIFF`/`RF64` through the end of the `fmt ` chunk when the
/// header is padded. Both framings take exactly this much.
pub const HEADER_RESERVATION: u64 = 96;

const DS64_BODY_SIZE: u32 = 28;
/// A 16-byte `fmt ` is 24 bytes shorter than the extensible form.
const PLAIN_FMT_SHORTFALL: u32 = 24;
const RF64_SIZE_MARKER: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Reserve a `JUNK` chunk so the header can later become RF64. Without it,
    /// writing 4 GiB or more fails at finalize.
    pub pad_header: bool,
    /// Refuse metadata whose cue points share an identifier.
    pub reject_duplicate_cues: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            pad_header: true,
            reject_duplicate_cues: false,
        }
    }
}

/// What [`build_header`] lays out.
#[derive(Debug, Clone, Copy)]
pub struct HeaderLayout<'a> {
    pub geometry: &'a AudioGeometry,
    pub channel_mask: u32,
    /// Chunk bodies written between `fmt ` and `data`, in order.
    pub metadata_chunks: &'a [(ChunkTag, Vec<u8>)],
    pub audio_bytes: u64,
    pub frames: u64,
    pub pad_header: bool,
}

/// Lays out everything before the audio: framing, `fmt `, metadata chunks and
/// the `data` chunk header.
pub fn build_header(layout: &HeaderLayout) -> WavResult<Vec<u8>> {
    let is_rf64 = layout.audio_bytes >= RF64_THRESHOLD;
    if is_rf64 && !layout.pad_header {
        return Err(WavError::HeaderOverflow {
            bytes: layout.audio_bytes,
        });
    }

    let extensible = is_rf64 || layout.channel_mask != 0;
    let fmt = encode_fmt(layout.geometry, extensible, layout.channel_mask);

    let padding = match (layout.pad_header, extensible) {
        (false, _) => None,
        (true, true) => Some(DS64_BODY_SIZE),
        (true, false) => Some(DS64_BODY_SIZE + PLAIN_FMT_SHORTFALL),
    };

    let framing_len = 12
        + padding.map_or(0, |p| CHUNK_HEADER_SIZE + p as u64)
        + chunk_size_on_disk(&fmt);
    let metadata_len: u64 = layout
        .metadata_chunks
        .iter()
        .map(|(_, body)| chunk_size_on_disk(body))
        .sum();

    // Everything after the 8-byte RIFF header.
    let riff_size = round_up_even(
        framing_len - CHUNK_HEADER_SIZE
            + metadata_len
            + CHUNK_HEADER_SIZE
            + round_up_even(layout.audio_bytes),
    );

    let mut out = Vec::with_capacity((framing_len + metadata_len + CHUNK_HEADER_SIZE) as usize);

    if is_rf64 {
        write_chunk_header(&mut out, ChunkTag::RF64, RF64_SIZE_MARKER)?;
        out.write_all(&ChunkTag::WAVE.0)?;
        write_chunk_header(&mut out, ChunkTag::DS64, DS64_BODY_SIZE)?;
        out.write_u64::<LittleEndian>(riff_size)?;
        out.write_u64::<LittleEndian>(layout.audio_bytes)?;
        out.write_u64::<LittleEndian>(layout.frames)?;
        out.write_u32::<LittleEndian>(0)?; // table length
    } else {
        let riff_size = u32::try_from(riff_size).unwrap_or(u32::MAX);
        write_chunk_header(&mut out, ChunkTag::RIFF, riff_size)?;
        out.write_all(&ChunkTag::WAVE.0)?;
        if let Some(padding) = padding {
            write_chunk_header(&mut out, ChunkTag::JUNK, padding)?;
            out.resize(out.len() + padding as usize, 0);
        }
    }

    write_chunk(&mut out, ChunkTag::FMT, &fmt)?;
    for (tag, body) in layout.metadata_chunks {
        write_chunk(&mut out, *tag, body)?;
    }

    let data_len = if is_rf64 {
        RF64_SIZE_MARKER
    } else {
        layout.audio_bytes as u32
    };
    write_chunk_header(&mut out, ChunkTag::DATA, data_len)?;

    Ok(out)
}

/// Incremental WAV writer.
///
/// A provisional header is written up front and patched on [`flush`] and
/// [`finalize`]. Dropping an unfinalized writer finalizes it, ignoring errors.
///
/// [`flush`]: WavWriter::flush
/// [`finalize`]: WavWriter::finalize
pub struct WavWriter<W: Write + Seek> {
    sink: Option<W>,
    geometry: AudioGeometry,
    format: SampleFormat,
    channel_mask: u32,
    options: WriterOptions,
    metadata_chunks: Vec<(ChunkTag, Vec<u8>)>,
    header_anchor: u64,
    header_len: u64,
    bytes_written: u64,
    frames_written: u64,
    failed: bool,
    finalized: bool,
}

impl<W: Write + Seek> WavWriter<W> {
    /// Validates the output format, encodes the metadata and writes the
    /// provisional header at the sink's current position.
    pub fn new(
        sink: W,
        sample_rate: u32,
        layout: &ChannelLayout,
        format: SampleFormat,
        metadata: &MetadataMap,
        options: WriterOptions,
    ) -> WavResult<Self> {
        Self::new_with_chunks(sink, sample_rate, layout, format, metadata, &[], options)
    }

    /// Like [`WavWriter::new`], also writing `extra_chunks` verbatim after the
    /// metadata chunks. Framing chunks, and tags the metadata already
    /// produces (other than `LIST`), are left out.
    pub fn new_with_chunks(
        mut sink: W,
        sample_rate: u32,
        layout: &ChannelLayout,
        format: SampleFormat,
        metadata: &MetadataMap,
        extra_chunks: &[(ChunkTag, Vec<u8>)],
        options: WriterOptions,
    ) -> WavResult<Self> {
        if !POSSIBLE_BIT_DEPTHS.contains(&format.bits_per_sample()) {
            return Err(WavError::UnsupportedBitDepth(format.bits_per_sample()));
        }
        if !is_channel_layout_supported(layout) {
            return Err(WavError::UnsupportedChannelLayout(format!("{:?}", layout.roles())));
        }
        if sample_rate == 0 {
            return Err(WavError::UnsupportedFormat {
                reason: "sample rate of 0 Hz".to_string(),
            });
        }
        if options.reject_duplicate_cues {
            cue::check_unique_identifiers(metadata)?;
        }

        let header_anchor = sink.stream_position().map_err(WavError::SinkUnseekable)?;

        let geometry = AudioGeometry::new(sample_rate, layout.len() as u16, format);
        let channel_mask = layout.to_mask();
        let mut metadata_chunks = encode_metadata_chunks(metadata);
        let encoded_tags: Vec<ChunkTag> = metadata_chunks.iter().map(|(tag, _)| *tag).collect();
        for (tag, body) in extra_chunks {
            if tag.is_framing() || (*tag != ChunkTag::LIST && encoded_tags.contains(tag)) {
                tracing::warn!("not copying '{}' chunk over the writer's own", tag);
                continue;
            }
            metadata_chunks.push((*tag, body.clone()));
        }

        let header = build_header(&HeaderLayout {
            geometry: &geometry,
            channel_mask,
            metadata_chunks: &metadata_chunks,
            audio_bytes: 0,
            frames: 0,
            pad_header: options.pad_header,
        })?;
        sink.write_all(&header)?;

        dprintln!(
            "WavWriter: {} Hz, {} ch, {:?}, {} metadata chunks, {} byte header",
            sample_rate,
            layout.len(),
            format,
            metadata_chunks.len(),
            header.len()
        );

        let writer = Self {
            sink: Some(sink),
            geometry,
            format,
            channel_mask,
            options,
            metadata_chunks,
            header_anchor,
            header_len: header.len() as u64,
            bytes_written: 0,
            frames_written: 0,
            failed: false,
            finalized: false,
        };

        Ok(writer)
    }

    fn header(&self) -> WavResult<Vec<u8>> {
        build_header(&HeaderLayout {
            geometry: &self.geometry,
            channel_mask: self.channel_mask,
            metadata_chunks: &self.metadata_chunks,
            audio_bytes: self.bytes_written,
            frames: self.frames_written,
            pad_header: self.options.pad_header,
        })
    }

    pub fn geometry(&self) -> &AudioGeometry {
        &self.geometry
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Appends a planar batch. Integer and float buffers are both accepted
    /// and converted to the writer's sample format. Every channel must hold
    /// the same number of frames.
    pub fn write(&mut self, buffer: &SampleBuffer) -> WavResult<()> {
        if self.failed {
            return Err(WavError::WriterFailed);
        }

        let channels = self.geometry.channels as usize;
        if buffer.channels() != channels {
            return Err(WavError::ChannelCountMismatch {
                expected: channels,
                found: buffer.channels(),
            });
        }

        let (shortest, longest) = buffer.frame_range();
        if shortest != longest {
            return Err(WavError::UnevenChannelLengths { shortest, longest });
        }

        let frames = buffer.frames();
        let mut bytes = Vec::with_capacity(frames * self.geometry.bytes_per_frame as usize);
        samples::encode_interleaved(&mut bytes, buffer, self.format)?;

        let sink = self.sink.as_mut().ok_or(WavError::WriterFailed)?;
        if let Err(e) = sink.write_all(&bytes) {
            self.failed = true;
            if let Err(patch_err) = self.patch_header() {
                tracing::warn!("could not patch header after failed write: {}", patch_err);
            }
            return Err(WavError::WriteFailed(e));
        }

        self.bytes_written += bytes.len() as u64;
        self.frames_written += frames as u64;
        Ok(())
    }

    /// Pads, rewrites the header for the audio written so far, and leaves the
    /// sink positioned just past the padded audio.
    fn patch_header(&mut self) -> WavResult<()> {
        let header = self.header()?;
        if header.len() as u64 != self.header_len {
            return Err(WavError::HeaderOverflow {
                bytes: self.bytes_written,
            });
        }

        let anchor = self.header_anchor;
        let audio_end = anchor + self.header_len + self.bytes_written;
        let sink = self.sink.as_mut().ok_or(WavError::WriterFailed)?;

        if self.bytes_written % 2 == 1 {
            sink.seek(SeekFrom::Start(audio_end))
                .map_err(WavError::SinkUnseekable)?;
            sink.write_all(&[0])?; // padding
        }

        sink.seek(SeekFrom::Start(anchor))
            .map_err(WavError::SinkUnseekable)?;
        sink.write_all(&header)?;
        sink.seek(SeekFrom::Start(round_up_even(audio_end - anchor) + anchor))
            .map_err(WavError::SinkUnseekable)?;
        Ok(())
    }

    /// Makes the file valid as it stands, then returns to where writing left
    /// off. Any failure leaves the writer permanently failed.
    pub fn flush(&mut self) -> WavResult<()> {
        if self.failed {
            return Err(WavError::WriterFailed);
        }

        let result = self.flush_internal();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn flush_internal(&mut self) -> WavResult<()> {
        let position = self
            .sink
            .as_mut()
            .ok_or(WavError::WriterFailed)?
            .stream_position()
            .map_err(WavError::SinkUnseekable)?;
        self.patch_header()?;

        let sink = self.sink.as_mut().ok_or(WavError::WriterFailed)?;
        sink.seek(SeekFrom::Start(position))
            .map_err(WavError::SinkUnseekable)?;
        sink.flush()?;
        Ok(())
    }

    fn finalize_internal(&mut self) -> WavResult<()> {
        self.finalized = true;
        if self.failed {
            return Err(WavError::WriterFailed);
        }

        let result = self.patch_header().and_then(|_| {
            let sink = self.sink.as_mut().ok_or(WavError::WriterFailed)?;
            sink.flush()?;
            Ok(())
        });
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// Writes the final header and returns the sink, positioned after the
    /// padded audio.
    pub fn finalize(mut self) -> WavResult<W> {
        self.finalize_internal()?;
        self.sink.take().ok_or(WavError::WriterFailed)
    }
}

impl<W: Write + Seek> Drop for WavWriter<W> {
    fn drop(&mut self) {
        if !self.finalized {
            if let Err(e) = self.finalize_internal() {
                tracing::warn!("WavWriter dropped without finalize: {}", e);
            }
        }
    }
}
