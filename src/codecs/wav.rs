use crate::codecs::ChannelLayout;

mod mapped;
mod reader;
mod writer;

pub use mapped::MappedWavReader;
pub use reader::{DataExtent, WavHeader, WavReader};
pub use writer::{HEADER_RESERVATION, HeaderLayout, WavWriter, WriterOptions, build_header};

/// Sample rates offered to callers choosing an output format.
pub const POSSIBLE_SAMPLE_RATES: [u32; 14] = [
    8000, 11025, 12000, 16000, 22050, 32000, 44100, 48000, 88200, 96000, 176400, 192000, 352800,
    384000,
];

pub const POSSIBLE_BIT_DEPTHS: [u16; 4] = [8, 16, 24, 32];

/// Data sizes at or above this need an RF64 header.
pub const RF64_THRESHOLD: u64 = 1 << 32;

/// True when the layout is all discrete channels or every channel is a
/// speaker a WAV channel mask can name.
pub fn is_channel_layout_supported(layout: &ChannelLayout) -> bool {
    !layout.is_empty()
        && (layout.is_discrete() || layout.roles().iter().all(|role| role.is_wav_speaker()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::ChannelRole;

    #[test]
    fn test_supported_layouts() {
        for channels in 1..=8 {
            assert!(is_channel_layout_supported(&ChannelLayout::canonical(channels)));
        }
        assert!(is_channel_layout_supported(&ChannelLayout::discrete(12)));
        assert!(is_channel_layout_supported(&ChannelLayout::new([
            ChannelRole::TOP_FRONT_LEFT,
            ChannelRole::TOP_REAR_RIGHT,
        ])));

        // A named speaker with no mask bit, mixed with discrete channels.
        assert!(!is_channel_layout_supported(&ChannelLayout::new([
            ChannelRole(40),
            ChannelRole::discrete(0),
        ])));
        assert!(!is_channel_layout_supported(&ChannelLayout::new([
            ChannelRole::LEFT,
            ChannelRole::discrete(0),
        ])));
        assert!(!is_channel_layout_supported(&ChannelLayout::default()));
    }
}
