//! Default configuration constants for meditone.
//!
//! This module provides shared constants used across the pipeline stages and
//! the configuration types so that every stage agrees on the audio format and
//! the pacing policy.

/// Audio sample rate in Hz for every buffer and container in the pipeline.
///
/// The TTS service returns 24kHz PCM; nothing downstream resamples.
pub const SAMPLE_RATE: u32 = 24_000;

/// Bits per sample (signed little-endian PCM).
pub const BITS_PER_SAMPLE: u16 = 16;

/// Bytes per sample, derived from [`BITS_PER_SAMPLE`].
pub const BYTES_PER_SAMPLE: u32 = (BITS_PER_SAMPLE / 8) as u32;

/// Channel count. All audio is mono.
pub const CHANNELS: u16 = 1;

/// Size of the canonical RIFF/WAVE header written for PCM output.
pub const WAV_HEADER_BYTES: usize = 44;

/// Longest timeline a single WAV container can hold, in samples.
///
/// RIFF stores the chunk size as `u32`: the data bytes plus the 36 header
/// bytes that follow the size field must fit.
pub const MAX_TIMELINE_SAMPLES: u64 =
    (u32::MAX as u64 - (WAV_HEADER_BYTES as u64 - 8)) / BYTES_PER_SAMPLE as u64;

/// Fixed delay inserted before every TTS request except the first.
///
/// The upstream service allows roughly 3 requests per minute.
pub const REQUEST_INTERVAL_SECS: u64 = 22;

/// Total synthesis attempts per segment (first try plus retries).
pub const MAX_ATTEMPTS: u32 = 3;

/// Base backoff unit. Attempt `n` waits `2^n * BACKOFF_BASE_SECS`.
pub const BACKOFF_BASE_SECS: u64 = 5;

/// Upper bound for a single backoff wait.
pub const BACKOFF_CAP_SECS: u64 = 30;

/// Default TTS model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Default prebuilt voice.
pub const DEFAULT_VOICE: &str = "Kore";

/// Default TTS endpoint (without trailing slash).
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Instruction prepended to every segment before synthesis.
pub const INSTRUCTION_PREFIX: &str =
    "Speak calmly and slowly, in a soft and soothing meditation guide voice: ";

/// Default HTTP request timeout for a single TTS call.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default URL prefix under which final recordings are published.
pub const PUBLIC_URL_PREFIX: &str = "/meditations";

/// File extension for every container written by the pipeline.
pub const AUDIO_EXTENSION: &str = "wav";
