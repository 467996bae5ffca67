//! Chunked transcription driver.
//!
//! STT providers cap the upload size. Audio under the cap goes up in one
//! request; anything larger is cut into time-contiguous chunks sized so each
//! stays under the cap, transcribed (up to a bounded number in flight), and
//! stitched back together with every timing shifted onto the recording clock.
//!
//! A failed chunk fails the whole recording. Partial transcripts are never
//! returned.

use super::{RawTranscription, SttClient};
use crate::audio::AudioSource;
use crate::config::{PipelineConfig, MIN_CHUNK_MS};
use crate::error::{PipelineError, Result};
use crate::transcript::{self, NormalizedTranscript};
use futures_util::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One planned upload: a time range of the recording plus the offset its
/// transcription must be shifted by.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    pub start_ms: u64,
    pub end_ms: u64,
    pub offset_seconds: f64,
}

/// Compute the chunk layout for a blob of `byte_len` bytes spanning
/// `duration_ms`. A blob within the cap yields a single whole-range chunk.
pub fn plan_chunks(byte_len: u64, duration_ms: u64, max_bytes: u64) -> Vec<ChunkPlan> {
    if byte_len <= max_bytes {
        return vec![ChunkPlan {
            start_ms: 0,
            end_ms: duration_ms,
            offset_seconds: 0.0,
        }];
    }

    let mut chunk_ms =
        (duration_ms as u128 * max_bytes as u128 / byte_len as u128) as u64;
    if chunk_ms == 0 {
        chunk_ms = MIN_CHUNK_MS;
    }

    let mut plans = Vec::new();
    let mut start_ms = 0;
    while start_ms < duration_ms {
        let end_ms = (start_ms + chunk_ms).min(duration_ms);
        plans.push(ChunkPlan {
            start_ms,
            end_ms,
            offset_seconds: start_ms as f64 / 1000.0,
        });
        start_ms = end_ms;
    }
    plans
}

/// Drives an [`SttClient`] over one recording, chunking when needed.
pub struct ChunkedTranscriber {
    client: Arc<dyn SttClient>,
    config: PipelineConfig,
}

impl ChunkedTranscriber {
    pub fn new(client: Arc<dyn SttClient>, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    /// Transcribe the whole recording into one [`NormalizedTranscript`].
    pub async fn transcribe(
        &self,
        audio: &dyn AudioSource,
        cancel: &CancellationToken,
    ) -> Result<NormalizedTranscript> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let byte_len = audio.byte_len();
        let duration_ms = audio.duration_ms();
        if byte_len == 0 {
            return Err(PipelineError::InvalidInput("empty audio blob".to_string()));
        }
        if duration_ms == 0 {
            return Err(PipelineError::InvalidInput(
                "audio reports zero duration".to_string(),
            ));
        }

        if byte_len <= self.config.stt_max_bytes {
            let bytes = audio.read_all()?;
            let raw = self.call(bytes, "recording.wav", cancel).await?;
            return transcript::normalize(&raw, 0.0, &self.config);
        }

        let plans = plan_chunks(byte_len, duration_ms, self.config.stt_max_bytes);
        info!(
            "Audio exceeds provider cap ({} > {} bytes); transcribing {} chunks",
            byte_len,
            self.config.stt_max_bytes,
            plans.len()
        );

        let pieces: Vec<NormalizedTranscript> = stream::iter(
            plans.iter().enumerate().map(|(i, plan)| {
                let cancel = cancel.clone();
                async move {
                    let bytes = audio.read_range(plan.start_ms, plan.end_ms)?;
                    let name = format!("chunk-{:03}.wav", i);
                    debug!(
                        "Chunk {} covers {}..{} ms ({} bytes)",
                        i,
                        plan.start_ms,
                        plan.end_ms,
                        bytes.len()
                    );
                    let raw = self.call(bytes, &name, &cancel).await?;
                    transcript::normalize(&raw, plan.offset_seconds, &self.config)
                }
            }),
        )
        .buffered(self.config.effective_concurrency())
        .try_collect()
        .await?;

        Ok(transcript::concat(pieces))
    }

    async fn call(
        &self,
        bytes: Vec<u8>,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<RawTranscription> {
        tokio::select! {
            result = self.client.transcribe(bytes, name) => result,
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        }
    }
}
