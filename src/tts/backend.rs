//! The seam between the synthesizer and the external TTS service.

use crate::audio::AudioBuffer;
use crate::error::MeditoneError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One synthesis request as sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub model: String,
    /// Full prompt: instruction prefix followed by the segment text.
    pub prompt: String,
    pub voice: String,
}

/// Raw service response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechResponse {
    /// Base64 PCM payload. `None` when the service answered without audio.
    pub audio_base64: Option<String>,
    /// Declared payload type, e.g. `audio/L16;codec=pcm;rate=24000`.
    pub mime_type: Option<String>,
}

impl SpeechResponse {
    pub fn with_audio(audio_base64: impl Into<String>) -> Self {
        Self {
            audio_base64: Some(audio_base64.into()),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Failure class reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429 / quota exhaustion. Retried with backoff.
    RateLimited,
    /// Invalid or missing credentials. Never retried.
    Auth,
    /// The model does not exist or the key has no access to it. Never retried.
    ModelUnavailable,
    /// Anything else. Never retried.
    Unknown,
}

/// A classified backend failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a failure from its HTTP status (if any) and message text.
    ///
    /// Rate limiting wins over the other classes, since quota messages often
    /// mention the model name.
    pub fn classify(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        let kind = if status == Some(429)
            || message.contains("429")
            || lower.contains("quota")
            || lower.contains("too many requests")
            || message.contains("RESOURCE_EXHAUSTED")
        {
            FailureKind::RateLimited
        } else if matches!(status, Some(401) | Some(403)) || lower.contains("api key") {
            FailureKind::Auth
        } else if status == Some(404) || lower.contains("model") {
            FailureKind::ModelUnavailable
        } else {
            FailureKind::Unknown
        };

        Self { kind, message }
    }
}

impl From<BackendError> for MeditoneError {
    fn from(err: BackendError) -> Self {
        let message = err.message;
        match err.kind {
            FailureKind::RateLimited => MeditoneError::RateLimited { message },
            FailureKind::Auth => MeditoneError::Auth { message },
            FailureKind::ModelUnavailable => MeditoneError::ModelUnavailable { message },
            FailureKind::Unknown => MeditoneError::Tts { message },
        }
    }
}

/// External text-to-speech service.
///
/// This trait allows swapping implementations (real HTTP service vs scripted mock).
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// Perform one synthesis call. No retries happen at this level.
    async fn generate(
        &self,
        request: &SpeechRequest,
    ) -> std::result::Result<SpeechResponse, BackendError>;

    /// Name for logging/debugging.
    fn name(&self) -> &str {
        "tts"
    }
}

/// Implement TtsBackend for Arc<T> so one backend can serve several pipelines.
#[async_trait]
impl<T: TtsBackend + ?Sized> TtsBackend for Arc<T> {
    async fn generate(
        &self,
        request: &SpeechRequest,
    ) -> std::result::Result<SpeechResponse, BackendError> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Encode a buffer the way the service delivers audio: base64 of LE PCM bytes.
pub fn pcm_base64(buffer: &AudioBuffer) -> String {
    let bytes: Vec<u8> = buffer
        .samples()
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();
    STANDARD.encode(bytes)
}

type Outcome = std::result::Result<SpeechResponse, BackendError>;

/// Backend that replays queued outcomes, for tests and offline dry runs.
///
/// Outcomes are consumed in order; once the queue is empty the fallback
/// outcome (if any) repeats forever, otherwise calls fail as `Unknown`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    queue: Mutex<VecDeque<Outcome>>,
    fallback: Option<Outcome>,
    requests: Mutex<Vec<SpeechRequest>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful call returning `buffer`.
    pub fn then_audio(self, buffer: &AudioBuffer) -> Self {
        self.then(Ok(SpeechResponse::with_audio(pcm_base64(buffer))))
    }

    /// Queue a successful call that carries no audio.
    pub fn then_empty(self) -> Self {
        self.then(Ok(SpeechResponse::default()))
    }

    /// Queue a failing call.
    pub fn then_error(self, error: BackendError) -> Self {
        self.then(Err(error))
    }

    /// Queue an arbitrary outcome.
    pub fn then(self, outcome: Outcome) -> Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(outcome);
        }
        self
    }

    /// Outcome repeated after the queue runs dry.
    pub fn always(mut self, outcome: Outcome) -> Self {
        self.fallback = Some(outcome);
        self
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TtsBackend for ScriptedBackend {
    async fn generate(&self, request: &SpeechRequest) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let queued = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match (queued, &self.fallback) {
            (Some(outcome), _) => outcome,
            (None, Some(fallback)) => fallback.clone(),
            (None, None) => Err(BackendError::new(
                FailureKind::Unknown,
                "scripted backend has no more responses",
            )),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
