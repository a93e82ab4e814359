pub mod codecs;
pub mod error;
pub mod metadata;
mod prelude;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tempfile::NamedTempFile;

pub use codecs::{
    AudioGeometry, ChannelLayout, ChannelRole, ChunkTag, Levels, MappedWavReader, MetadataChunk,
    SampleBuffer, SampleFormat, WavHeader, WavReader, WavWriter, WriterOptions,
};
pub use error::{WavError, WavResult};
pub use metadata::{MetadataExt, MetadataMap};

use crate::prelude::*;

/// Frames copied per block when rewriting a file.
const COPY_BLOCK_FRAMES: usize = 64 * 1024;

pub fn debug_println(args: std::fmt::Arguments) {
    if cfg!(debug_assertions) {
        tracing::debug!("{}", args);
    }
}

// Helper macro to use it like println!
#[macro_export]
macro_rules! dprintln {
    ($($arg:tt)*) => {
        $crate::debug_println(format_args!($($arg)*))
    };
}

/// Decodes the metadata of a WAV file without reading its audio.
pub fn read_metadata(path: impl AsRef<Path>) -> R<MetadataMap> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let header = WavHeader::read_from(&mut BufReader::new(file))
        .with_context(|| format!("Failed to read WAV header of {}", path.display()))?;
    Ok(header.metadata)
}

/// Rewrites a WAV file with new metadata.
///
/// The audio is copied into a temporary file next to the original, keeping
/// its sample rate, channel layout and sample format, and the temporary file
/// then replaces the original. Chunks the metadata map has no keys for are
/// copied across unchanged.
pub fn replace_metadata_in_file(path: impl AsRef<Path>, metadata: &MetadataMap) -> R<()> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = WavReader::open(BufReader::new(file))
        .with_context(|| format!("Failed to read WAV file {}", path.display()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

    let mut writer = WavWriter::new_with_chunks(
        BufWriter::new(temp),
        reader.geometry().sample_rate,
        &reader.layout(),
        reader.sample_format(),
        metadata,
        &reader.header().extra_chunks,
        WriterOptions::default(),
    )?;

    let total = reader.len();
    let mut position = 0u64;
    while position < total {
        let frames = (total - position).min(COPY_BLOCK_FRAMES as u64) as usize;
        let block = reader.read_samples(position, frames)?;
        writer.write(&block)?;
        position += frames as u64;
    }

    dprintln!("Copied {} frames of {}", total, path.display());

    let temp = writer
        .finalize()?
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush temporary file: {}", e.error()))?;
    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_metadata_reports_missing_file() {
        let err = read_metadata("/nonexistent/file.wav").unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }

    #[test]
    fn test_read_metadata_rejects_non_wav() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"fLaC\0\0\0\x22").unwrap();
        let err = read_metadata(file.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<WavError>(), Some(WavError::NotThisFormat)));
    }
}
