//! Pipeline configuration.
//!
//! All knobs are plain values with serde derives so embedders can nest the
//! struct inside their own configuration files. The core itself never touches
//! the filesystem or environment.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Default STT provider upload cap: 25 MiB.
pub const DEFAULT_STT_MAX_BYTES: u64 = 26_214_400;

/// Minimum chunk length when the computed chunk duration degenerates.
pub const MIN_CHUNK_MS: u64 = 10_000;

/// Which speaker-assignment algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentStrategy {
    /// Prefer the word-vote path when the provider attached speaker ids,
    /// fall back to sentence midpoints otherwise.
    #[default]
    Auto,
    /// Always map provider speaker ids by activity-log voting.
    WordVote,
    /// Always split segments into sentences and assign by midpoint.
    SentenceMidpoint,
}

/// Tunables for diarization, chunked transcription and summarisation.
///
/// Defaults mirror the recorder deployments this pipeline was extracted from;
/// `speaker_offset_seconds` in particular is a per-deployment calibration and
/// deliberately defaults to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Additive correction applied to speaker-block boundaries, in seconds.
    /// Models a known latency between the activity-event clock and the audio
    /// clock. The word-vote path does not use it.
    pub speaker_offset_seconds: f64,

    /// Reassignment threshold: another speaker takes a segment when their
    /// in-segment overlap is at least this multiple of the assigned
    /// speaker's. Must be greater than 1.
    pub duration_ratio: f64,

    /// Minimum provider-segment length considered for speaker-id voting.
    pub min_utterance_seconds: f64,

    /// Inter-word gap that ends a provider segment during voting.
    pub min_speaker_change_gap_seconds: f64,

    /// Inter-segment gap that triggers a paragraph break in the full text.
    pub paragraph_break_gap_seconds: f64,

    /// Merge gap for consecutive same-speaker utterances (sentence path).
    pub segment_merge_gap_seconds: f64,

    /// Merge gap for consecutive same-speaker utterances (word path).
    pub word_merge_gap_seconds: f64,

    /// Upload size cap of the STT provider; larger audio is chunked.
    pub stt_max_bytes: u64,

    /// Maximum chunk transcriptions in flight at once.
    pub stt_concurrency: usize,

    /// Context budget of the summariser, in tokens.
    pub summariser_token_budget: usize,

    /// Conservative tokens-per-character estimate for the target language.
    pub tokens_per_character: f64,

    /// Speaker-assignment algorithm selection.
    pub assignment: AssignmentStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            speaker_offset_seconds: 0.0,
            duration_ratio: 1.5,
            min_utterance_seconds: 1.0,
            min_speaker_change_gap_seconds: 0.5,
            paragraph_break_gap_seconds: 0.5,
            segment_merge_gap_seconds: 0.3,
            word_merge_gap_seconds: 1.0,
            stt_max_bytes: DEFAULT_STT_MAX_BYTES,
            stt_concurrency: 4,
            summariser_token_budget: 16_000,
            tokens_per_character: 0.4,
            assignment: AssignmentStrategy::Auto,
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.duration_ratio <= 1.0 {
            return Err(PipelineError::InvalidInput(format!(
                "duration_ratio must be > 1, got {}",
                self.duration_ratio
            )));
        }
        if self.stt_max_bytes == 0 {
            return Err(PipelineError::InvalidInput(
                "stt_max_bytes must be positive".to_string(),
            ));
        }
        if self.tokens_per_character <= 0.0 {
            return Err(PipelineError::InvalidInput(format!(
                "tokens_per_character must be positive, got {}",
                self.tokens_per_character
            )));
        }
        if self.summariser_token_budget == 0 {
            return Err(PipelineError::InvalidInput(
                "summariser_token_budget must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("min_utterance_seconds", self.min_utterance_seconds),
            (
                "min_speaker_change_gap_seconds",
                self.min_speaker_change_gap_seconds,
            ),
            ("paragraph_break_gap_seconds", self.paragraph_break_gap_seconds),
            ("segment_merge_gap_seconds", self.segment_merge_gap_seconds),
            ("word_merge_gap_seconds", self.word_merge_gap_seconds),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(PipelineError::InvalidInput(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Effective in-flight window for chunk transcription.
    pub fn effective_concurrency(&self) -> usize {
        self.stt_concurrency.max(1)
    }
}
