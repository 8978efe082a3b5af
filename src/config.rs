use crate::defaults;
use crate::error::{MeditoneError, Result};
use crate::pipeline::PipelineConfig;
use crate::tts::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub tts: TtsConfig,
    pub pacing: PacingConfig,
    pub output: OutputConfig,
}

/// Text-to-speech service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    pub model: String,
    pub voice: String,
    pub endpoint: String,
    pub instruction: String,
    pub request_timeout_secs: u64,
}

/// Request pacing and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PacingConfig {
    pub strategy: PacingStrategy,
    pub request_interval_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
}

/// How requests are spaced out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PacingStrategy {
    /// Full interval before every request after the first.
    FixedDelay,
    /// Only the part of the interval not already spent since the last request.
    TokenBucket,
}

/// Scratch and publishing locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub scratch_dir: PathBuf,
    pub public_dir: PathBuf,
    pub public_url_prefix: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            voice: defaults::DEFAULT_VOICE.to_string(),
            endpoint: defaults::DEFAULT_ENDPOINT.to_string(),
            instruction: defaults::INSTRUCTION_PREFIX.to_string(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            strategy: PacingStrategy::FixedDelay,
            request_interval_secs: defaults::REQUEST_INTERVAL_SECS,
            max_attempts: defaults::MAX_ATTEMPTS,
            backoff_base_secs: defaults::BACKOFF_BASE_SECS,
            backoff_cap_secs: defaults::BACKOFF_CAP_SECS,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            scratch_dir: dirs::cache_dir()
                .map(|d| d.join("meditone").join("scratch"))
                .unwrap_or(pipeline.scratch_root),
            public_dir: pipeline.public_dir,
            public_url_prefix: pipeline.public_url_prefix,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns `ConfigFileNotFound` if the file is missing and an error if
    /// it contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MeditoneError::ConfigFileNotFound {
                path: path.display().to_string(),
            },
            _ => MeditoneError::Io(e),
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(MeditoneError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MEDITONE_MODEL → tts.model
    /// - MEDITONE_VOICE → tts.voice
    /// - MEDITONE_ENDPOINT → tts.endpoint
    /// - MEDITONE_SCRATCH_DIR → output.scratch_dir
    /// - MEDITONE_PUBLIC_DIR → output.public_dir
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("MEDITONE_MODEL")
            && !model.is_empty()
        {
            self.tts.model = model;
        }

        if let Ok(voice) = std::env::var("MEDITONE_VOICE")
            && !voice.is_empty()
        {
            self.tts.voice = voice;
        }

        if let Ok(endpoint) = std::env::var("MEDITONE_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.tts.endpoint = endpoint;
        }

        if let Ok(dir) = std::env::var("MEDITONE_SCRATCH_DIR")
            && !dir.is_empty()
        {
            self.output.scratch_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("MEDITONE_PUBLIC_DIR")
            && !dir.is_empty()
        {
            self.output.public_dir = PathBuf::from(dir);
        }

        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| {
            Err(MeditoneError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.tts.model.trim().is_empty() {
            return invalid("tts.model", "must not be empty");
        }
        if self.tts.voice.trim().is_empty() {
            return invalid("tts.voice", "must not be empty");
        }
        if !self.tts.endpoint.starts_with("http://") && !self.tts.endpoint.starts_with("https://")
        {
            return invalid("tts.endpoint", "must be an http(s) URL");
        }
        if self.tts.request_timeout_secs == 0 {
            return invalid("tts.request_timeout_secs", "must be positive");
        }
        if self.pacing.max_attempts == 0 {
            return invalid("pacing.max_attempts", "must be at least 1");
        }
        if self.pacing.backoff_cap_secs < self.pacing.backoff_base_secs {
            return invalid(
                "pacing.backoff_cap_secs",
                "must not be smaller than pacing.backoff_base_secs",
            );
        }
        if !self.output.public_url_prefix.starts_with('/') {
            return invalid("output.public_url_prefix", "must start with '/'");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.pacing.max_attempts,
            backoff_base: Duration::from_secs(self.pacing.backoff_base_secs),
            backoff_cap: Duration::from_secs(self.pacing.backoff_cap_secs),
        }
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_secs(self.pacing.request_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.tts.request_timeout_secs)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            scratch_root: self.output.scratch_dir.clone(),
            public_dir: self.output.public_dir.clone(),
            public_url_prefix: self.output.public_url_prefix.clone(),
        }
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/meditone/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("meditone")
            .join("config.toml")
    }
}
