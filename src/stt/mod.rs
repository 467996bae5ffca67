//! Speech-to-text provider interface.
//!
//! The core consumes one provider operation: upload a finite audio blob, get
//! back verbose JSON with either segment-level or word-level timings. The
//! [`SttClient`] trait keeps the transport swappable (and mockable in tests);
//! [`chunker::ChunkedTranscriber`] drives it for audio larger than the
//! provider's upload cap.

pub mod chunker;
pub mod http;

pub use chunker::ChunkedTranscriber;
pub use http::{HttpSttClient, SttConfig, TimestampGranularity};

use crate::error::Result;
use crate::transcript::WordKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Verbose transcription response, as the provider serialises it.
///
/// Only the fields the pipeline depends on are modelled; everything else in
/// the provider's response is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTranscription {
    /// Full transcript text.
    pub text: String,
    /// Segment-level timings, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<RawSegment>>,
    /// Word-level timings with opaque speaker ids, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<RawWord>>,
}

/// One provider segment: a sentence- or clause-sized span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSegment {
    pub text: String,
    /// Seconds from the start of the uploaded blob.
    pub start: f64,
    pub end: f64,
}

/// One word-level entry. Punctuation and spacing entries often come without
/// timings; those default to zero and are never used for alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWord {
    #[serde(rename = "type")]
    pub kind: WordKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
}

/// Trait for STT providers.
#[async_trait]
pub trait SttClient: Send + Sync {
    /// Provider name for logging (e.g. "elevenlabs").
    fn name(&self) -> &'static str;

    /// Upload one audio blob and return its verbose transcription.
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<RawTranscription>;
}
