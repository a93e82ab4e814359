use crate::codecs::{ChunkTag, SampleFormat};
use crate::prelude::*;

// Format tags
pub const FORMAT_PCM: u16 = 1;
pub const FORMAT_IEEE_FLOAT: u16 = 3;
pub const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// WAVE_FORMAT_OGG_VORBIS_MODE_{1,2,3} and their _PLUS variants.
const OGG_VORBIS_FORMATS: [u16; 6] = [0x674F, 0x6750, 0x6751, 0x676F, 0x6770, 0x6771];

// Chunk Structures
pub const STANDARD_FMT_CHUNK_SIZE: usize = 16;
pub const EXTENSIBLE_FMT_CHUNK_SIZE: usize = 40;
const EXTENSION_SIZE: u16 = 22;

/// Extensible sub-format GUIDs in on-disk byte order.
pub const PCM_SUBFORMAT: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];
pub const IEEE_FLOAT_SUBFORMAT: [u8; 16] = [
    0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];
pub const AMBISONIC_SUBFORMAT: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x21, 0x07, 0xD3, 0x11, 0x86, 0x44, 0xC8, 0xC1, 0xCA, 0x00, 0x00, 0x00,
];

/// Sample layout of the audio in a `data` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioGeometry {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub is_float: bool,
    /// Zero marks a format this codec cannot decode.
    pub bytes_per_frame: u32,
    pub channel_mask: Option<u32>,
}

impl AudioGeometry {
    pub fn new(sample_rate: u32, channels: u16, format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: format.bits_per_sample(),
            is_float: format.is_float(),
            bytes_per_frame: channels as u32 * format.bytes_per_sample() as u32,
            channel_mask: None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.sample_rate > 0
            && self.channels > 0
            && self.bytes_per_frame > 0
            && self.bits_per_sample <= 32
            && self.sample_format().is_ok()
    }

    pub fn sample_format(&self) -> WavResult<SampleFormat> {
        SampleFormat::from_bits(self.bits_per_sample, self.is_float)
    }
}

/// A speaker position. Values 1..=18 follow the WAV channel-mask bit order
/// (bit `n` is role `n + 1`); values from 64 up are unnamed discrete channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelRole(pub u16);

impl ChannelRole {
    pub const LEFT: Self = Self(1);
    pub const RIGHT: Self = Self(2);
    pub const CENTRE: Self = Self(3);
    pub const LFE: Self = Self(4);
    pub const LEFT_SURROUND: Self = Self(5);
    pub const RIGHT_SURROUND: Self = Self(6);
    pub const LEFT_CENTRE: Self = Self(7);
    pub const RIGHT_CENTRE: Self = Self(8);
    pub const CENTRE_SURROUND: Self = Self(9);
    pub const LEFT_SURROUND_SIDE: Self = Self(10);
    pub const RIGHT_SURROUND_SIDE: Self = Self(11);
    pub const TOP_MIDDLE: Self = Self(12);
    pub const TOP_FRONT_LEFT: Self = Self(13);
    pub const TOP_FRONT_CENTRE: Self = Self(14);
    pub const TOP_FRONT_RIGHT: Self = Self(15);
    pub const TOP_REAR_LEFT: Self = Self(16);
    pub const TOP_REAR_CENTRE: Self = Self(17);
    pub const TOP_REAR_RIGHT: Self = Self(18);
    pub const DISCRETE_0: Self = Self(64);

    pub const fn discrete(index: u16) -> Self {
        Self(Self::DISCRETE_0.0 + index)
    }

    pub fn is_discrete(self) -> bool {
        self >= Self::DISCRETE_0
    }

    /// True for the speakers a WAV channel mask can name.
    pub fn is_wav_speaker(self) -> bool {
        (Self::LEFT..=Self::TOP_REAR_RIGHT).contains(&self)
    }
}

/// An ordered set of channel roles, kept in ascending role order (which is
/// also the interleaving order inside a WAV file).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelLayout(Vec<ChannelRole>);

impl ChannelLayout {
    pub fn new(roles: impl IntoIterator<Item = ChannelRole>) -> Self {
        let mut roles: Vec<ChannelRole> = roles.into_iter().collect();
        roles.sort();
        roles.dedup();
        Self(roles)
    }

    pub fn mono() -> Self {
        Self::new([ChannelRole::CENTRE])
    }

    pub fn stereo() -> Self {
        Self::new([ChannelRole::LEFT, ChannelRole::RIGHT])
    }

    pub fn discrete(channels: u16) -> Self {
        Self::new((0..channels).map(ChannelRole::discrete))
    }

    /// The conventional layout for a plain channel count.
    pub fn canonical(channels: u16) -> Self {
        use ChannelRole as C;
        match channels {
            1 => Self::mono(),
            2 => Self::stereo(),
            3 => Self::new([C::LEFT, C::RIGHT, C::CENTRE]),
            4 => Self::new([C::LEFT, C::RIGHT, C::LEFT_SURROUND, C::RIGHT_SURROUND]),
            5 => Self::new([C::LEFT, C::RIGHT, C::CENTRE, C::LEFT_SURROUND, C::RIGHT_SURROUND]),
            6 => Self::new([
                C::LEFT,
                C::RIGHT,
                C::CENTRE,
                C::LFE,
                C::LEFT_SURROUND,
                C::RIGHT_SURROUND,
            ]),
            7 => Self::new([
                C::LEFT,
                C::RIGHT,
                C::CENTRE,
                C::LEFT_SURROUND,
                C::RIGHT_SURROUND,
                C::LEFT_CENTRE,
                C::RIGHT_CENTRE,
            ]),
            8 => Self::new([
                C::LEFT,
                C::RIGHT,
                C::CENTRE,
                C::LFE,
                C::LEFT_SURROUND,
                C::RIGHT_SURROUND,
                C::LEFT_CENTRE,
                C::RIGHT_CENTRE,
            ]),
            n => Self::discrete(n),
        }
    }

    /// Maps a WAV channel mask to a layout holding `channels` channels.
    ///
    /// Old encoders often leave the mask at zero for mono and stereo files, so
    /// a zero mask with one or two channels yields mono/stereo. Any other count
    /// mismatch is made up with discrete channels.
    pub fn from_mask(mask: u32, channels: u16) -> Self {
        let mut roles: Vec<ChannelRole> = (0..32)
            .filter(|bit| mask & (1 << bit) != 0)
            .map(|bit| ChannelRole(bit + 1))
            .collect();

        if roles.len() != channels as usize {
            if channels <= 2 && mask == 0 {
                return Self::canonical(channels);
            }

            let mut next = 0;
            while roles.len() < channels as usize {
                roles.push(ChannelRole::discrete(next));
                next += 1;
            }
        }

        Self::new(roles)
    }

    /// The WAV channel mask for this layout. Discrete layouts, mono and
    /// stereo never need one and give 0.
    pub fn to_mask(&self) -> u32 {
        if self.is_discrete() || *self == Self::mono() || *self == Self::stereo() {
            return 0;
        }

        self.0
            .iter()
            .filter(|role| (1..=32).contains(&role.0))
            .fold(0, |mask, role| mask | 1 << (role.0 - 1))
    }

    pub fn is_discrete(&self) -> bool {
        self.0.iter().all(|role| role.is_discrete())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn roles(&self) -> &[ChannelRole] {
        &self.0
    }
}

/// The decoded contents of a `fmt ` chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatChunk {
    pub format_tag: u16,
    pub geometry: AudioGeometry,
    /// Present only for WAVE_FORMAT_EXTENSIBLE.
    pub layout: Option<ChannelLayout>,
    /// An extensible chunk whose sub-format GUID was not recognized.
    pub unknown_subformat: bool,
}

impl FormatChunk {
    /// Interprets a `fmt ` chunk body.
    ///
    /// Ogg Vorbis format tags return [`WavError::UnsupportedSubformat`]; other
    /// formats that can't be decoded leave `bytes_per_frame` at zero.
    pub fn decode(body: &[u8]) -> WavResult<Self> {
        if body.len() < STANDARD_FMT_CHUNK_SIZE {
            return Err(WavError::malformed(
                ChunkTag::FMT,
                format!("{} bytes is shorter than a PCM format chunk", body.len()),
            ));
        }

        let mut cursor = Cursor::new(body);
        let format_tag = cursor.read_u16::<LittleEndian>()?;
        let channels = cursor.read_u16::<LittleEndian>()?;
        let sample_rate = cursor.read_u32::<LittleEndian>()?;
        let bytes_per_sec = cursor.read_u32::<LittleEndian>()?;
        cursor.read_u16::<LittleEndian>()?; // block align
        let mut bits_per_sample = cursor.read_u16::<LittleEndian>()?;

        if OGG_VORBIS_FORMATS.contains(&format_tag) {
            return Err(WavError::UnsupportedSubformat { format_tag });
        }

        // Some producers misreport the bit depth; recover it from the byte rate.
        let mut bytes_per_frame = if bits_per_sample > 64 {
            let bytes_per_frame = bytes_per_sec.checked_div(sample_rate).unwrap_or(0);
            bits_per_sample = (8 * bytes_per_frame)
                .checked_div(channels as u32)
                .unwrap_or(0) as u16;
            bytes_per_frame
        } else {
            channels as u32 * bits_per_sample as u32 / 8
        };

        let mut is_float = false;
        let mut channel_mask = None;
        let mut layout = None;
        let mut unknown_subformat = false;

        match format_tag {
            FORMAT_PCM => {}
            FORMAT_IEEE_FLOAT => is_float = true,
            FORMAT_EXTENSIBLE if body.len() < EXTENSIBLE_FMT_CHUNK_SIZE => bytes_per_frame = 0,
            FORMAT_EXTENSIBLE => {
                cursor.read_u16::<LittleEndian>()?; // extension size
                cursor.read_u16::<LittleEndian>()?; // valid bits per sample
                let mask = cursor.read_u32::<LittleEndian>()?;
                let mut guid = [0u8; 16];
                cursor.read_exact(&mut guid)?;

                channel_mask = Some(mask);
                layout = Some(ChannelLayout::from_mask(mask, channels));

                if guid == IEEE_FLOAT_SUBFORMAT {
                    is_float = true;
                } else if guid != PCM_SUBFORMAT && guid != AMBISONIC_SUBFORMAT {
                    unknown_subformat = true;
                    bytes_per_frame = 0;
                }
            }
            _ => bytes_per_frame = 0,
        }

        Ok(Self {
            format_tag,
            geometry: AudioGeometry {
                sample_rate,
                channels,
                bits_per_sample,
                is_float,
                bytes_per_frame,
                channel_mask,
            },
            layout,
            unknown_subformat,
        })
    }
}

/// Builds a `fmt ` chunk body: 16 bytes, or 40 for the extensible form.
pub fn encode_fmt(geometry: &AudioGeometry, extensible: bool, channel_mask: u32) -> Vec<u8> {
    let bytes_per_frame = geometry.channels as u32 * geometry.bits_per_sample as u32 / 8;
    let size = if extensible {
        EXTENSIBLE_FMT_CHUNK_SIZE
    } else {
        STANDARD_FMT_CHUNK_SIZE
    };
    let mut out = Vec::with_capacity(size);

    let format_tag = match (extensible, geometry.is_float) {
        (true, _) => FORMAT_EXTENSIBLE,
        (false, true) => FORMAT_IEEE_FLOAT,
        (false, false) => FORMAT_PCM,
    };

    out.extend_from_slice(&format_tag.to_le_bytes());
    out.extend_from_slice(&geometry.channels.to_le_bytes());
    out.extend_from_slice(&geometry.sample_rate.to_le_bytes());
    out.extend_from_slice(&(bytes_per_frame * geometry.sample_rate).to_le_bytes()); // byte rate
    out.extend_from_slice(&(bytes_per_frame as u16).to_le_bytes()); // block align
    out.extend_from_slice(&geometry.bits_per_sample.to_le_bytes());

    if extensible {
        out.extend_from_slice(&EXTENSION_SIZE.to_le_bytes());
        out.extend_from_slice(&geometry.bits_per_sample.to_le_bytes()); // valid bits
        out.extend_from_slice(&channel_mask.to_le_bytes());
        out.extend_from_slice(if geometry.is_float {
            &IEEE_FLOAT_SUBFORMAT
        } else {
            &PCM_SUBFORMAT
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt_body(format_tag: u16, channels: u16, bits: u16, byte_rate: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u16::<LittleEndian>(format_tag).unwrap();
        out.write_u16::<LittleEndian>(channels).unwrap();
        out.write_u32::<LittleEndian>(48000).unwrap();
        out.write_u32::<LittleEndian>(byte_rate).unwrap();
        out.write_u16::<LittleEndian>(channels * bits / 8).unwrap();
        out.write_u16::<LittleEndian>(bits).unwrap();
        out
    }

    #[test]
    fn test_pcm_and_float_tags() {
        let pcm = FormatChunk::decode(&fmt_body(FORMAT_PCM, 2, 24, 288000)).unwrap();
        assert_eq!(pcm.geometry.bytes_per_frame, 6);
        assert!(!pcm.geometry.is_float);
        assert!(pcm.geometry.is_usable());

        let float = FormatChunk::decode(&fmt_body(FORMAT_IEEE_FLOAT, 1, 32, 192000)).unwrap();
        assert!(float.geometry.is_float);
        assert_eq!(float.geometry.sample_format().unwrap(), SampleFormat::F32);
    }

    #[test]
    fn test_ogg_vorbis_is_rejected_as_subformat() {
        let err = FormatChunk::decode(&fmt_body(0x674F, 2, 16, 0)).unwrap_err();
        assert!(matches!(err, WavError::UnsupportedSubformat { format_tag: 0x674F }));
        assert!(err.belongs_to_another_decoder());
    }

    #[test]
    fn test_unknown_tag_invalidates_geometry() {
        let chunk = FormatChunk::decode(&fmt_body(0x0055, 2, 16, 0)).unwrap();
        assert_eq!(chunk.geometry.bytes_per_frame, 0);
        assert!(!chunk.geometry.is_usable());
    }

    #[test]
    fn test_oversized_bit_depth_recovered_from_byte_rate() {
        let chunk = FormatChunk::decode(&fmt_body(FORMAT_PCM, 2, 100, 48000 * 4)).unwrap();
        assert_eq!(chunk.geometry.bytes_per_frame, 4);
        assert_eq!(chunk.geometry.bits_per_sample, 16);
    }

    #[test]
    fn test_plain_float_fmt_layout() {
        let geometry = AudioGeometry::new(44100, 2, SampleFormat::F32);
        let body = encode_fmt(&geometry, false, 0);
        assert_eq!(body.len(), STANDARD_FMT_CHUNK_SIZE);
        assert_eq!(&body[0..2], &FORMAT_IEEE_FLOAT.to_le_bytes());
        assert_eq!(&body[2..4], &2u16.to_le_bytes());
        assert_eq!(&body[4..8], &44100u32.to_le_bytes());
        assert_eq!(&body[8..12], &(44100u32 * 8).to_le_bytes());
        assert_eq!(&body[12..14], &8u16.to_le_bytes());
        assert_eq!(&body[14..16], &32u16.to_le_bytes());
    }

    #[test]
    fn test_extensible_round_trip() {
        let geometry = AudioGeometry::new(48000, 6, SampleFormat::I24);
        let mask = ChannelLayout::canonical(6).to_mask();
        assert_eq!(mask, 0x3F);

        let body = encode_fmt(&geometry, true, mask);
        assert_eq!(body.len(), EXTENSIBLE_FMT_CHUNK_SIZE);

        let chunk = FormatChunk::decode(&body).unwrap();
        assert_eq!(chunk.format_tag, FORMAT_EXTENSIBLE);
        assert_eq!(chunk.geometry.channel_mask, Some(0x3F));
        assert_eq!(chunk.layout, Some(ChannelLayout::canonical(6)));
        assert!(chunk.geometry.is_usable());
    }

    #[test]
    fn test_short_extensible_chunk_is_unusable() {
        let mut body = fmt_body(FORMAT_EXTENSIBLE, 2, 16, 192000);
        body.extend_from_slice(&[22, 0, 16, 0]);
        let chunk = FormatChunk::decode(&body).unwrap();
        assert_eq!(chunk.geometry.bytes_per_frame, 0);
    }

    #[test]
    fn test_unknown_guid_is_flagged() {
        let geometry = AudioGeometry::new(44100, 2, SampleFormat::I16);
        let mut body = encode_fmt(&geometry, true, 3);
        body[24] = 0x7F;
        let chunk = FormatChunk::decode(&body).unwrap();
        assert!(chunk.unknown_subformat);
        assert_eq!(chunk.geometry.bytes_per_frame, 0);
    }

    #[test]
    fn test_zero_mask_falls_back_to_mono_and_stereo() {
        assert_eq!(ChannelLayout::from_mask(0, 1), ChannelLayout::mono());
        assert_eq!(ChannelLayout::from_mask(0, 2), ChannelLayout::stereo());
    }

    #[test]
    fn test_mask_mismatch_pads_with_discrete_channels() {
        let layout = ChannelLayout::from_mask(0b11, 4);
        assert_eq!(
            layout.roles(),
            &[
                ChannelRole::LEFT,
                ChannelRole::RIGHT,
                ChannelRole::discrete(0),
                ChannelRole::discrete(1),
            ]
        );

        let layout = ChannelLayout::from_mask(0, 3);
        assert_eq!(layout, ChannelLayout::discrete(3));
    }

    #[test]
    fn test_masks_for_simple_layouts() {
        assert_eq!(ChannelLayout::mono().to_mask(), 0);
        assert_eq!(ChannelLayout::stereo().to_mask(), 0);
        assert_eq!(ChannelLayout::discrete(4).to_mask(), 0);
        assert_eq!(ChannelLayout::canonical(3).to_mask(), 0b111);
    }
}
