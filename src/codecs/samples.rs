use crate::prelude::*;

// Sample conversion constants
const U8_SCALE: f32 = 127.0;
const U8_OFFSET: f32 = 128.0;
const I16_MAX_F: f32 = 32767.0;
const I24_MAX_F: f32 = 8388607.0;
const I32_MAX_F: f64 = 2147483647.0;
const I32_DIVISOR: f32 = 2147483648.0;
const I24_SIGN_BIT: i32 = 0x800000;
const I24_SIGN_EXTENSION_MASK: i32 = -16777216; // 0xFF000000 as i32
const BYTE_MASK: i32 = 0xFF;

/// On-disk encoding of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    U8,
    #[default]
    I16,
    I24,
    I32,
    F32,
}

impl SampleFormat {
    pub fn bits_per_sample(&self) -> u16 {
        match self {
            SampleFormat::U8 => 8,
            SampleFormat::I16 => 16,
            SampleFormat::I24 => 24,
            SampleFormat::I32 => 32,
            SampleFormat::F32 => 32,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample() as usize / 8
    }

    pub fn is_float(&self) -> bool {
        *self == SampleFormat::F32
    }

    /// Integer PCM format for a bit depth; 32 bits maps to integer, not float.
    pub fn from_bits(bits: u16, is_float: bool) -> WavResult<Self> {
        match (bits, is_float) {
            (8, false) => Ok(SampleFormat::U8),
            (16, false) => Ok(SampleFormat::I16),
            (24, false) => Ok(SampleFormat::I24),
            (32, false) => Ok(SampleFormat::I32),
            (32, true) => Ok(SampleFormat::F32),
            _ => Err(WavError::UnsupportedBitDepth(bits)),
        }
    }
}

/// Planar audio: one vector per channel.
///
/// Integer samples are left-justified to the full 32-bit range regardless of
/// the on-disk bit depth, so 16-bit 0x1234 is held as 0x1234_0000.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    Int(Vec<Vec<i32>>),
    Float(Vec<Vec<f32>>),
}

impl SampleBuffer {
    /// A zeroed buffer in the representation `format` decodes to.
    pub fn silence(format: SampleFormat, channels: usize, frames: usize) -> Self {
        if format.is_float() {
            SampleBuffer::Float(vec![vec![0.0; frames]; channels])
        } else {
            SampleBuffer::Int(vec![vec![0; frames]; channels])
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            SampleBuffer::Int(data) => data.len(),
            SampleBuffer::Float(data) => data.len(),
        }
    }

    /// Frames available in every channel.
    pub fn frames(&self) -> usize {
        match self {
            SampleBuffer::Int(data) => data.iter().map(Vec::len).min().unwrap_or(0),
            SampleBuffer::Float(data) => data.iter().map(Vec::len).min().unwrap_or(0),
        }
    }

    /// Frame counts of the shortest and longest channel.
    pub fn frame_range(&self) -> (usize, usize) {
        let lengths: Vec<usize> = match self {
            SampleBuffer::Int(data) => data.iter().map(Vec::len).collect(),
            SampleBuffer::Float(data) => data.iter().map(Vec::len).collect(),
        };
        let shortest = lengths.iter().copied().min().unwrap_or(0);
        let longest = lengths.iter().copied().max().unwrap_or(0);
        (shortest, longest)
    }

    /// Normalized float view, integer samples scaled into [-1, 1).
    pub fn to_float(&self) -> Vec<Vec<f32>> {
        match self {
            SampleBuffer::Float(data) => data.clone(),
            SampleBuffer::Int(data) => data
                .par_iter()
                .map(|ch| ch.iter().map(|&s| s as f32 / I32_DIVISOR).collect())
                .collect(),
        }
    }
}

/// Reads one sample at the start of `bytes` as a left-justified 32-bit integer.
fn read_int(bytes: &[u8], format: SampleFormat) -> i32 {
    match format {
        SampleFormat::U8 => (bytes[0] as i32 - 128) << 24,
        SampleFormat::I16 => (i16::from_le_bytes([bytes[0], bytes[1]]) as i32) << 16,
        SampleFormat::I24 => {
            let val = ((bytes[2] as i32) << 16) | ((bytes[1] as i32) << 8) | (bytes[0] as i32);
            let val = if val & I24_SIGN_BIT != 0 {
                val | I24_SIGN_EXTENSION_MASK
            } else {
                val
            };
            val << 8
        }
        SampleFormat::I32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        SampleFormat::F32 => {
            let val = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            (val.clamp(-1.0, 1.0) as f64 * I32_MAX_F) as i32
        }
    }
}

/// Reads one sample at the start of `bytes` as a normalized float.
pub fn read_float(bytes: &[u8], format: SampleFormat) -> f32 {
    match format {
        SampleFormat::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        _ => read_int(bytes, format) as f32 / I32_DIVISOR,
    }
}

/// De-interleaves `frames` frames of `channels` channels into planar samples.
///
/// Frames missing from the end of `input` decode as silence.
pub fn decode_interleaved(
    input: &[u8],
    channels: usize,
    format: SampleFormat,
    frames: usize,
) -> SampleBuffer {
    let bytes_per_sample = format.bytes_per_sample();
    let bytes_per_frame = bytes_per_sample * channels;

    let sample_at = |frame: usize, ch: usize| {
        let idx = frame * bytes_per_frame + ch * bytes_per_sample;
        input.get(idx..idx + bytes_per_sample)
    };

    if format.is_float() {
        let data = (0..channels)
            .into_par_iter() // Parallelize over channels
            .map(|ch| {
                (0..frames)
                    .map(|frame| sample_at(frame, ch).map_or(0.0, |b| read_float(b, format)))
                    .collect()
            })
            .collect();
        SampleBuffer::Float(data)
    } else {
        let data = (0..channels)
            .into_par_iter()
            .map(|ch| {
                (0..frames)
                    .map(|frame| sample_at(frame, ch).map_or(0, |b| read_int(b, format)))
                    .collect()
            })
            .collect();
        SampleBuffer::Int(data)
    }
}

/// Interleaves a planar buffer into `out` using the on-disk encoding `format`.
///
/// Only the frames every channel holds are written.
pub fn encode_interleaved<W: Write>(
    out: &mut W,
    buffer: &SampleBuffer,
    format: SampleFormat,
) -> std::io::Result<()> {
    let frames = buffer.frames();

    match buffer {
        SampleBuffer::Int(data) => {
            for i in 0..frames {
                for ch in data {
                    write_int_sample(out, ch[i], format)?;
                }
            }
        }
        SampleBuffer::Float(data) => {
            for i in 0..frames {
                for ch in data {
                    write_float_sample(out, ch[i], format)?;
                }
            }
        }
    }

    Ok(())
}

fn write_int_sample<W: Write>(out: &mut W, sample: i32, format: SampleFormat) -> std::io::Result<()> {
    match format {
        SampleFormat::U8 => out.write_u8(((sample >> 24) + 128) as u8),
        SampleFormat::I16 => out.write_i16::<LittleEndian>((sample >> 16) as i16),
        SampleFormat::I24 => {
            let val = sample >> 8;
            let bytes = [
                (val & BYTE_MASK) as u8,
                ((val >> 8) & BYTE_MASK) as u8,
                ((val >> 16) & BYTE_MASK) as u8,
            ];
            out.write_all(&bytes)
        }
        SampleFormat::I32 => out.write_i32::<LittleEndian>(sample),
        SampleFormat::F32 => out.write_f32::<LittleEndian>(sample as f32 / I32_DIVISOR),
    }
}

fn write_float_sample<W: Write>(out: &mut W, sample: f32, format: SampleFormat) -> std::io::Result<()> {
    match format {
        SampleFormat::U8 => {
            let val = (sample * U8_SCALE + U8_OFFSET).clamp(0.0, 255.0) as u8;
            out.write_u8(val)
        }
        SampleFormat::I16 => out.write_i16::<LittleEndian>((sample.clamp(-1.0, 1.0) * I16_MAX_F) as i16),
        SampleFormat::I24 => {
            let val = (sample.clamp(-1.0, 1.0) * I24_MAX_F) as i32;
            write_int_sample(out, val << 8, SampleFormat::I24)
        }
        SampleFormat::I32 => {
            let val = (sample.clamp(-1.0, 1.0) as f64 * I32_MAX_F) as i32;
            out.write_i32::<LittleEndian>(val)
        }
        SampleFormat::F32 => out.write_f32::<LittleEndian>(sample),
    }
}

/// Minimum and maximum normalized sample values over a range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Levels {
    pub min: f32,
    pub max: f32,
}

/// Scans one channel of interleaved data for its extremes.
pub fn scan_min_max(
    input: &[u8],
    channels: usize,
    format: SampleFormat,
    channel: usize,
    frames: usize,
) -> Levels {
    let bytes_per_sample = format.bytes_per_sample();
    let bytes_per_frame = bytes_per_sample * channels;

    let mut values = (0..frames).filter_map(|frame| {
        let idx = frame * bytes_per_frame + channel * bytes_per_sample;
        input
            .get(idx..idx + bytes_per_sample)
            .map(|b| read_float(b, format))
    });

    let Some(first) = values.next() else {
        return Levels::default();
    };

    values.fold(Levels { min: first, max: first }, |acc, v| Levels {
        min: acc.min.min(v),
        max: acc.max.max(v),
    })
}
