//! Speech synthesizer client: one segment of text in, one audio buffer out.

use crate::audio::AudioBuffer;
use crate::defaults;
use crate::error::{MeditoneError, Result};
use crate::pacing::{Sleeper, TokioSleeper};
use crate::tts::backend::{SpeechRequest, SpeechResponse, TtsBackend};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry budget and backoff curve for rate-limited calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(defaults::BACKOFF_BASE_SECS),
            backoff_cap: Duration::from_secs(defaults::BACKOFF_CAP_SECS),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based): `min(cap, 2^attempt * base)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.backoff_base
            .checked_mul(factor)
            .map_or(self.backoff_cap, |d| d.min(self.backoff_cap))
    }
}

/// Converts text into speech through a [`TtsBackend`], retrying rate limits.
pub struct SpeechSynthesizer {
    backend: Arc<dyn TtsBackend>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    model: String,
    instruction: String,
}

impl SpeechSynthesizer {
    pub fn new(backend: Arc<dyn TtsBackend>) -> Self {
        Self {
            backend,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
            model: defaults::DEFAULT_MODEL.to_string(),
            instruction: defaults::INSTRUCTION_PREFIX.to_string(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Build the request sent for `text` spoken by `voice`.
    pub fn request_for(&self, text: &str, voice: &str) -> SpeechRequest {
        SpeechRequest {
            model: self.model.clone(),
            prompt: format!("{}{}", self.instruction, text),
            voice: voice.to_string(),
        }
    }

    /// Synthesize `text` with `voice`.
    ///
    /// Rate-limited calls are retried after `policy.backoff_for(attempt)`
    /// until `max_attempts` is reached, then `QuotaExceeded` is returned.
    /// Every other failure is returned immediately.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioBuffer> {
        let request = self.request_for(text, voice);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(attempt, backend = self.backend.name(), voice, "TTS request");

            let (detail, err) = match self.backend.generate(&request).await {
                Ok(response) => return decode_response(response),
                Err(err) => (err.message.clone(), MeditoneError::from(err)),
            };

            if !err.is_retryable() {
                return Err(err);
            }

            if attempt >= max_attempts {
                warn!(attempts = attempt, "TTS quota exhausted, giving up");
                return Err(MeditoneError::QuotaExceeded {
                    attempts: attempt,
                    message: detail,
                });
            }

            let delay = self.policy.backoff_for(attempt);
            warn!(
                attempt,
                delay_secs = delay.as_secs_f64(),
                error = %detail,
                "TTS rate limited, backing off"
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Turn a service response into samples.
fn decode_response(response: SpeechResponse) -> Result<AudioBuffer> {
    if let Some(mime) = response.mime_type.as_deref() {
        check_declared_rate(mime)?;
    }

    let encoded = response
        .audio_base64
        .filter(|data| !data.is_empty())
        .ok_or(MeditoneError::MissingAudio)?;

    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| MeditoneError::InvalidAudio {
            message: format!("base64 decode failed: {e}"),
        })?;

    AudioBuffer::from_pcm_bytes(&bytes)
}

/// Reject payloads whose MIME type declares a different sample rate.
fn check_declared_rate(mime: &str) -> Result<()> {
    let declared = mime
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse::<u32>().ok());

    match declared {
        Some(rate) if rate != defaults::SAMPLE_RATE => Err(MeditoneError::InvalidAudio {
            message: format!(
                "service returned {rate}Hz audio ({mime}), expected {}Hz",
                defaults::SAMPLE_RATE
            ),
        }),
        _ => Ok(()),
    }
}
