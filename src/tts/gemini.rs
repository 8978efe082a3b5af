//! Gemini `generateContent` speech backend.
//!
//! Sends the prompt with an audio-only response modality and a prebuilt
//! voice, and returns the inline base64 PCM from the first candidate.

use crate::error::{MeditoneError, Result};
use crate::tts::backend::{BackendError, FailureKind, SpeechRequest, SpeechResponse, TtsBackend};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP backend for the Gemini TTS models.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiBackend {
    /// Create a backend. The API key is resolved by the caller.
    pub fn new(api_key: impl Into<String>, endpoint: &str, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MeditoneError::Auth {
                message: "API key is empty".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeditoneError::Tts {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url_for(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

#[async_trait]
impl TtsBackend for GeminiBackend {
    async fn generate(
        &self,
        request: &SpeechRequest,
    ) -> std::result::Result<SpeechResponse, BackendError> {
        let response = self
            .client
            .post(self.url_for(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest::from_speech(request))
            .send()
            .await
            .map_err(|e| {
                let status = e.status().map(|s| s.as_u16());
                transport_error(status, &e.without_url().to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            BackendError::new(
                FailureKind::Unknown,
                format!("Failed to read TTS response: {e}"),
            )
        })?;

        if !status.is_success() {
            let detail = error_detail(&body).unwrap_or(body);
            return Err(BackendError::classify(
                Some(status.as_u16()),
                format!("{status}: {detail}"),
            ));
        }

        parse_response(&body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Classify a failure that happened before a response body was read.
///
/// Without a status the failure is a transport problem (timeout, DNS,
/// connection reset) and is never classified from message text.
fn transport_error(status: Option<u16>, detail: &str) -> BackendError {
    let message = format!("TTS request failed: {detail}");
    match status {
        Some(code) => BackendError::classify(Some(code), message),
        None => BackendError::new(FailureKind::Unknown, message),
    }
}

/// Parse a successful `generateContent` body.
fn parse_response(body: &str) -> std::result::Result<SpeechResponse, BackendError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        BackendError::new(
            FailureKind::Unknown,
            format!("Failed to parse TTS response: {e}"),
        )
    })?;

    let inline = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data));

    Ok(match inline {
        Some(data) => SpeechResponse {
            audio_base64: Some(data.data),
            mime_type: data.mime_type,
        },
        None => SpeechResponse::default(),
    })
}

/// Pull `error.message` (and `error.status`) out of an error body, if it is JSON.
fn error_detail(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    Some(match envelope.error.status {
        Some(status) => format!("{} ({status})", envelope.error.message),
        None => envelope.error.message,
    })
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

impl<'a> GenerateRequest<'a> {
    fn from_speech(request: &'a SpeechRequest) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![TextPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: &request.voice,
                        },
                    },
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}
