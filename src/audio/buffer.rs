//! In-memory PCM buffer with the pipeline's fixed audio format.

use crate::defaults::{BITS_PER_SAMPLE, BYTES_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
use crate::error::{MeditoneError, Result};

/// 16-bit mono PCM samples at [`SAMPLE_RATE`].
///
/// The format is fixed for the life of the pipeline, so it is not stored per
/// buffer. A buffer is moved from stage to stage and never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioBuffer {
    samples: Vec<i16>,
}

impl AudioBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `samples` samples.
    pub fn with_capacity(samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(samples),
        }
    }

    /// Wrap existing samples.
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// Decode raw little-endian 16-bit PCM bytes.
    ///
    /// # Errors
    /// Returns `InvalidAudio` when the byte count is not a whole number of samples.
    pub fn from_pcm_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % BYTES_PER_SAMPLE as usize != 0 {
            return Err(MeditoneError::InvalidAudio {
                message: format!(
                    "{} bytes is not a whole number of {}-bit samples",
                    bytes.len(),
                    BITS_PER_SAMPLE
                ),
            });
        }

        let samples = bytes
            .chunks_exact(BYTES_PER_SAMPLE as usize)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Self { samples })
    }

    /// All-zero buffer of exactly `count` samples.
    pub fn silence_samples(count: u64) -> Self {
        Self {
            samples: vec![0i16; count as usize],
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of samples (equal to frames, since the format is mono).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Size of the sample data in bytes, excluding any container header.
    pub fn byte_len(&self) -> u64 {
        self.samples.len() as u64 * BYTES_PER_SAMPLE as u64
    }

    /// Duration estimate: `byte_len / (sample_rate * bytes_per_sample)`.
    pub fn duration_secs(&self) -> f64 {
        self.byte_len() as f64 / (SAMPLE_RATE as f64 * BYTES_PER_SAMPLE as f64)
    }

    /// Append another buffer, consuming it.
    pub fn append(&mut self, mut other: AudioBuffer) {
        self.samples.append(&mut other.samples);
    }

    /// Human-readable description of the fixed format, used in errors.
    pub fn format_description() -> String {
        describe_format(SAMPLE_RATE, BITS_PER_SAMPLE, CHANNELS)
    }
}

/// Describe a PCM format as `"{rate}Hz {bits}-bit {layout}"`.
pub fn describe_format(sample_rate: u32, bits: u16, channels: u16) -> String {
    let layout = match channels {
        1 => "mono".to_string(),
        2 => "stereo".to_string(),
        n => format!("{n}-channel"),
    };
    format!("{sample_rate}Hz {bits}-bit {layout}")
}
