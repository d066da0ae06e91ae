//! Canonical 44-byte PCM WAV header for an endless stream.
//!
//! Both RIFF size fields carry `0xFFFF_FFFF`, which players treat as
//! "unknown length" and keep reading until the connection closes. All
//! integers are little-endian regardless of the host.

/// Size of the encoded header.
pub const HEADER_LEN: usize = 44;

/// Chunk size used when the stream length is unknown.
pub const STREAMING_LEN: u32 = u32::MAX;

const PCM_FORMAT: u16 = 1;
const PCM_FMT_CHUNK_LEN: u32 = 16;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WavHeader {
    pub sample_rate: u32,
    pub channels: u16,
    /// Container width of one sample, in bits.
    pub bits_per_sample: u16,
    /// Length of the `data` chunk; [`STREAMING_LEN`] for endless streams.
    pub data_len: u32,
}

impl WavHeader {
    pub const fn streaming(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
            data_len: STREAMING_LEN,
        }
    }

    /// Bytes per frame across all channels, saturating at `u16::MAX`.
    pub const fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample.div_ceil(8))
    }

    /// Saturates at `u32::MAX`.
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(self.block_align() as u32)
    }

    const fn riff_len(&self) -> u32 {
        if self.data_len == STREAMING_LEN {
            STREAMING_LEN
        } else {
            self.data_len.saturating_add(HEADER_LEN as u32 - 8)
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mut at = 0;
        let mut put = |bytes: &[u8]| {
            out[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        };

        put(b"RIFF");
        put(&self.riff_len().to_le_bytes());
        put(b"WAVE");

        put(b"fmt ");
        put(&PCM_FMT_CHUNK_LEN.to_le_bytes());
        put(&PCM_FORMAT.to_le_bytes());
        put(&self.channels.to_le_bytes());
        put(&self.sample_rate.to_le_bytes());
        put(&self.byte_rate().to_le_bytes());
        put(&self.block_align().to_le_bytes());
        put(&self.bits_per_sample.to_le_bytes());

        put(b"data");
        put(&self.data_len.to_le_bytes());

        out
    }
}
