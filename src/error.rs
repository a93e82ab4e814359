//! Error types for the WAV codec.

use thiserror::Error;

use crate::codecs::ChunkTag;

/// Result type for codec operations.
pub type WavResult<T> = Result<T, WavError>;

/// Errors that can occur while reading or writing WAV/RF64 streams.
#[derive(Debug, Error)]
pub enum WavError {
    /// The stream does not start with `RIFF`/`RF64` + `WAVE`.
    ///
    /// This is the normal negative outcome of probing a stream, not a fault.
    #[error("stream is not a RIFF/RF64 WAVE file")]
    NotThisFormat,

    /// The `fmt ` chunk names a sub-format this codec does not decode
    /// (Ogg Vorbis in WAV, or an unknown extensible GUID). The source stream
    /// has been rewound so it can be handed to another decoder.
    #[error("unsupported WAV sub-format 0x{format_tag:04X}")]
    UnsupportedSubformat {
        /// Format tag from the `fmt ` chunk.
        format_tag: u16,
    },

    /// The stream parsed, but the resulting sample geometry is unusable.
    #[error("unusable sample format: {reason}")]
    UnsupportedFormat {
        /// What made the geometry unusable.
        reason: String,
    },

    /// An RF64 stream did not carry a valid `ds64` chunk right after `WAVE`.
    #[error("RF64 stream is missing its ds64 size chunk")]
    MissingDataSize,

    /// A chunk body is shorter than its layout requires or overruns its container.
    #[error("malformed '{tag}' chunk: {reason}")]
    MalformedChunk {
        /// Tag of the offending chunk.
        tag: ChunkTag,
        /// What was wrong with it.
        reason: String,
    },

    /// The writer could not seek back to patch its header.
    #[error("output stream cannot seek back to the header: {0}")]
    SinkUnseekable(#[source] std::io::Error),

    /// Writing audio data to the sink failed.
    #[error("failed to write audio data: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// The writer is in a failed state after an earlier error.
    #[error("writer has failed and rejects further writes")]
    WriterFailed,

    /// More than 2^32 bytes were written without a reserved RF64 header slot.
    #[error("{bytes} audio bytes need an RF64 header, but header padding was disabled")]
    HeaderOverflow {
        /// Audio bytes written.
        bytes: u64,
    },

    /// Bit depth outside 8/16/24/32.
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    /// Channel layout that cannot be expressed in a WAV channel mask.
    #[error("unsupported channel layout: {0}")]
    UnsupportedChannelLayout(String),

    /// A sample batch did not have the writer's channel count.
    #[error("expected {expected} channels, got {found}")]
    ChannelCountMismatch {
        /// Channels configured on the writer.
        expected: usize,
        /// Channels in the batch.
        found: usize,
    },

    /// The channels of a sample batch hold different numbers of frames.
    #[error("channels hold between {shortest} and {longest} frames")]
    UnevenChannelLengths {
        /// Frames in the shortest channel.
        shortest: usize,
        /// Frames in the longest channel.
        longest: usize,
    },

    /// Two cue points share an identifier while strict cue validation is on.
    #[error("duplicate cue identifier {0}")]
    DuplicateCueIdentifier(u32),

    /// A random-access read fell outside the mapped window.
    #[error("samples {start}..{end} are outside the mapped window {window_start}..{window_end}")]
    OutsideMappedWindow {
        /// First requested sample.
        start: u64,
        /// One past the last requested sample.
        end: u64,
        /// First mapped sample.
        window_start: u64,
        /// One past the last mapped sample.
        window_end: u64,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WavError {
    /// Creates a malformed chunk error.
    pub fn malformed(tag: ChunkTag, reason: impl Into<String>) -> Self {
        Self::MalformedChunk {
            tag,
            reason: reason.into(),
        }
    }

    /// True when the stream simply isn't a WAV file, or holds content that
    /// another decoder should handle.
    pub fn belongs_to_another_decoder(&self) -> bool {
        matches!(
            self,
            Self::NotThisFormat | Self::UnsupportedSubformat { .. }
        )
    }
}
