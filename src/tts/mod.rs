//! Text-to-speech: the backend seam and the retrying synthesizer client.

pub mod backend;
#[cfg(feature = "http")]
pub mod gemini;
pub mod synthesizer;

pub use backend::{
    BackendError, FailureKind, ScriptedBackend, SpeechRequest, SpeechResponse, TtsBackend,
};
#[cfg(feature = "http")]
pub use gemini::GeminiBackend;
pub use synthesizer::{RetryPolicy, SpeechSynthesizer};
