//! Error types for meditone.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeditoneError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Script parsing
    #[error("No timestamped segments found in script (expected lines like \"[00:00] text\")")]
    NoSegments,

    // Speech synthesis
    #[error("TTS rate limited: {message}")]
    RateLimited { message: String },

    #[error("TTS quota exceeded after {attempts} attempts: {message}")]
    QuotaExceeded { attempts: u32, message: String },

    #[error("TTS authentication failed: {message}")]
    Auth { message: String },

    #[error("TTS model unavailable: {message}")]
    ModelUnavailable { message: String },

    #[error("TTS request failed: {message}")]
    Tts { message: String },

    #[error("TTS response contained no audio data")]
    MissingAudio,

    #[error("TTS response contained invalid audio: {message}")]
    InvalidAudio { message: String },

    // Audio containers
    #[error("Audio format mismatch in {path}: expected {expected}, got {actual}")]
    AudioFormatMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // Pipeline preconditions
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Invalid run id {run_id:?}: {message}")]
    InvalidRunId { run_id: String, message: String },

    #[error("Scratch directory already exists: {path}")]
    ScratchDirExists { path: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeditoneError {
    /// Short class name for callers that report which stage class failed.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::ConfigFileNotFound { .. } | Self::ConfigInvalidValue { .. } | Self::Config(_) => {
                "config"
            }
            Self::NoSegments => "parse",
            Self::RateLimited { .. } => "rate_limited",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::Auth { .. } => "auth",
            Self::ModelUnavailable { .. } => "model_unavailable",
            Self::Tts { .. } | Self::MissingAudio | Self::InvalidAudio { .. } => "tts",
            Self::AudioFormatMismatch { .. } | Self::Wav(_) | Self::Io(_) => "io",
            Self::InvalidInput { .. } | Self::InvalidRunId { .. } | Self::ScratchDirExists { .. } => {
                "invalid_input"
            }
        }
    }

    /// Whether the error class is worth retrying after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, MeditoneError>;
