//! meditone - Guided meditation audio from timestamped scripts
//!
//! Parses a `[MM:SS] text` script, synthesizes each line through a
//! rate-limited TTS service and lays the speech out on one timeline.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pacing;
pub mod pipeline;
pub mod script;
pub mod tts;

// Core seams (pacer → backend → synthesizer)
pub use pacing::{RequestPacer, Sleeper};
pub use tts::backend::TtsBackend;
pub use tts::synthesizer::{RetryPolicy, SpeechSynthesizer};

// Pipeline
pub use pipeline::{MeditationPipeline, PipelineConfig, RunOutput, SegmentGenerator};

// Script model
pub use script::{Segment, parse_script};

// Audio
pub use audio::AudioBuffer;

// Error handling
pub use error::{MeditoneError, Result};

// Config
pub use config::{Config, PacingStrategy};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
