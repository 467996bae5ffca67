//! HTTP speech-to-text client.
//!
//! Speaks the multipart upload dialect of the ElevenLabs scribe endpoint,
//! which the recorders use in production: one `file` part plus form fields
//! for model, diarization and timestamp granularity. Any provider with the
//! same request/response shape works through a custom `base_url`.

use super::{RawTranscription, SttClient};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Requested timestamp granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampGranularity {
    /// Per-word timings with provider speaker ids; preferred for diarization.
    #[default]
    Word,
    /// Per-segment timings only.
    Segment,
}

impl TimestampGranularity {
    fn as_str(&self) -> &'static str {
        match self {
            TimestampGranularity::Word => "word",
            TimestampGranularity::Segment => "segment",
        }
    }
}

/// Configuration for the HTTP STT client.
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Provider API key.
    pub api_key: String,
    /// Base URL (e.g. "https://api.elevenlabs.io").
    pub base_url: String,
    /// Model identifier (e.g. "scribe_v1").
    pub model_id: String,
    /// ISO 639 language hint; omitted when `None`.
    pub language_code: Option<String>,
    /// Ask the provider to attach speaker ids to words.
    pub diarize: bool,
    /// Word- or segment-level timestamps.
    pub granularity: TimestampGranularity,
    /// Request timeout in seconds.
    pub timeout_secs: u32,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.elevenlabs.io".to_string(),
            model_id: "scribe_v1".to_string(),
            language_code: None,
            diarize: true,
            granularity: TimestampGranularity::Word,
            timeout_secs: 300,
        }
    }
}

/// HTTP [`SttClient`] implementation.
pub struct HttpSttClient {
    client: Client,
    config: SttConfig,
}

impl HttpSttClient {
    /// Create a new client with the given configuration.
    pub fn new(config: SttConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(PipelineError::InvalidInput(
                "STT API key is required".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| PipelineError::Internal(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/speech-to-text",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl SttClient for HttpSttClient {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<RawTranscription> {
        let byte_len = audio.len();
        let mut form = Form::new()
            .part("file", Part::bytes(audio).file_name(file_name.to_string()))
            .text("model_id", self.config.model_id.clone())
            .text("diarize", self.config.diarize.to_string())
            .text(
                "timestamps_granularity",
                self.config.granularity.as_str().to_string(),
            );
        if let Some(language) = &self.config.language_code {
            form = form.text("language_code", language.clone());
        }

        debug!(
            "Uploading {} ({} bytes) for transcription",
            file_name, byte_len
        );
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", &self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::ProviderUnavailable(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let raw: RawTranscription = response
            .json()
            .await
            .map_err(|e| PipelineError::ProviderContract(e.to_string()))?;

        info!(
            "Transcribed {} in {}ms ({} chars)",
            file_name,
            start.elapsed().as_millis(),
            raw.text.len()
        );

        Ok(raw)
    }
}
