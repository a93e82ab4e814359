use std::fs::File;
use std::ops::Range;
use std::path::Path;

use memmap2::Mmap;

use super::reader::readable_format;
use crate::codecs::{AudioGeometry, Levels, SampleBuffer, SampleFormat, WavHeader, samples};
use crate::prelude::*;

/// Random-access reader over a mapped byte window of a WAV file.
///
/// `data` holds the file bytes starting at `window_offset`. Only frames that
/// lie entirely inside the window can be read; anything else is
/// [`WavError::OutsideMappedWindow`]. Frames past the end of the audio read
/// as silence and need no mapping.
pub struct MappedWavReader<D> {
    data: D,
    window_offset: u64,
    header: WavHeader,
    sample_format: SampleFormat,
    window: Range<u64>,
}

impl MappedWavReader<Mmap> {
    /// Maps the whole file and decodes its header from the mapping.
    pub fn open(path: impl AsRef<Path>) -> WavResult<Self> {
        let file = File::open(path)?;
        let mapped_file = unsafe { MmapOptions::new().map(&file)? };
        let header = WavHeader::read_from(&mut Cursor::new(&mapped_file[..]))?;
        Self::from_window(mapped_file, 0, header)
    }
}

impl<D: AsRef<[u8]>> MappedWavReader<D> {
    /// Wraps `data`, which holds the file bytes from `window_offset` on.
    pub fn from_window(data: D, window_offset: u64, header: WavHeader) -> WavResult<Self> {
        let sample_format = readable_format(&header)?;
        let window = frames_in_window(
            header.geometry(),
            header.data.start_offset,
            header.data.sample_count,
            window_offset..window_offset + data.as_ref().len() as u64,
        );

        dprintln!(
            "MappedWavReader: frames {}..{} of {} mapped",
            window.start,
            window.end,
            header.data.sample_count
        );

        Ok(Self {
            data,
            window_offset,
            header,
            sample_format,
            window,
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

    /// Frames available through the mapping.
    pub fn mapped_frames(&self) -> Range<u64> {
        self.window.clone()
    }

    /// Length in frames.
    pub fn len(&self) -> u64 {
        self.header.data.sample_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of `frames` frames from `start`, all of which must be mapped.
    fn frame_bytes(&self, start: u64, frames: u64) -> WavResult<&[u8]> {
        let end = start + frames;
        if start < self.window.start || end > self.window.end {
            return Err(WavError::OutsideMappedWindow {
                start,
                end,
                window_start: self.window.start,
                window_end: self.window.end,
            });
        }

        let bytes_per_frame = self.geometry().bytes_per_frame as u64;
        let first = (self.header.data.start_offset + start * bytes_per_frame - self.window_offset) as usize;
        let last = first + (frames * bytes_per_frame) as usize;
        Ok(&self.data.as_ref()[first..last])
    }

    /// Frames from `start` that exist in the audio, capped at `frames`.
    fn available(&self, start: u64, frames: usize) -> u64 {
        self.len().saturating_sub(start).min(frames as u64)
    }

    /// Reads `frames` frames starting at `start`.
    pub fn read_samples(&self, start: u64, frames: usize) -> WavResult<SampleBuffer> {
        let available = self.available(start, frames);
        let bytes = if available > 0 {
            self.frame_bytes(start, available)?
        } else {
            &[]
        };

        Ok(samples::decode_interleaved(
            bytes,
            self.geometry().channels as usize,
            self.sample_format,
            frames,
        ))
    }

    /// One frame as normalized floats, one per channel.
    pub fn get_sample(&self, frame: u64) -> WavResult<Vec<f32>> {
        let channels = self.geometry().channels as usize;
        if frame >= self.len() {
            return Ok(vec![0.0; channels]);
        }

        let bytes = self.frame_bytes(frame, 1)?;
        Ok(bytes
            .chunks_exact(self.sample_format.bytes_per_sample())
            .map(|b| samples::read_float(b, self.sample_format))
            .collect())
    }

    /// Per-channel minimum and maximum over `frames` frames from `start`,
    /// clamped to the end of the audio.
    pub fn read_max_levels(&self, start: u64, frames: usize) -> WavResult<Vec<Levels>> {
        let channels = self.geometry().channels as usize;
        let available = self.available(start, frames);
        if available == 0 {
            return Ok(vec![Levels::default(); channels]);
        }

        let bytes = self.frame_bytes(start, available)?;
        let format = self.sample_format;
        Ok((0..channels)
            .into_par_iter()
            .map(|ch| samples::scan_min_max(bytes, channels, format, ch, available as usize))
            .collect())
    }
}

/// Frames of the data extent wholly contained in the byte range `window`.
fn frames_in_window(
    geometry: &AudioGeometry,
    data_start: u64,
    sample_count: u64,
    window: Range<u64>,
) -> Range<u64> {
    let bytes_per_frame = geometry.bytes_per_frame.max(1) as u64;
    let first = window.start.saturating_sub(data_start).div_ceil(bytes_per_frame);
    let last = (window.end.saturating_sub(data_start) / bytes_per_frame).min(sample_count);
    first.min(last)..last
}
