//! Speaker assignment: turning a normalized transcript plus an activity
//! timeline into labelled utterances.
//!
//! Two algorithms, chosen by what the STT provider delivered:
//!
//! - **Word vote** (`words`): the provider attached opaque speaker ids to
//!   words; each id is mapped to a display name by sampling the activity log
//!   across that id's speech and voting.
//! - **Sentence midpoint** (`segments`): no speaker ids; each segment is
//!   split into sentences and each sentence labelled with whoever the
//!   activity log says was speaking at its midpoint.
//!
//! Both paths finish with the same consecutive-same-speaker merge and emit
//! utterances on the absolute wall clock.

pub mod segments;
pub mod words;

use crate::config::{AssignmentStrategy, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::timeline::{ActivityTimeline, RecordingContext};
use crate::transcript::NormalizedTranscript;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Label for spans no speaker could be attributed to.
pub const UNKNOWN_SPEAKER: &str = "unknown";

/// A contiguous span of text spoken by one labelled speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarizedUtterance {
    /// Display name from the activity log, or `"unknown"`.
    pub speaker: String,
    pub text: String,
    /// Absolute UTC start of the span.
    pub start: DateTime<Utc>,
    /// Absolute UTC end of the span; always after `start`.
    pub end: DateTime<Utc>,
}

/// The pipeline's final product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizedTranscript {
    /// Full normalized transcript text.
    #[serde(rename = "text")]
    pub full_text: String,
    /// Labelled utterances, ordered by start time.
    #[serde(rename = "diarized")]
    pub utterances: Vec<DiarizedUtterance>,
    /// Short topical summary; `null` when summarisation failed or was not
    /// requested.
    pub tldr: Option<String>,
}

/// Assign a speaker to every span of the transcript.
///
/// Never fails on speaker-data quality: an empty or useless activity log
/// yields `"unknown"` labels, not errors.
pub fn assign(
    transcript: &NormalizedTranscript,
    timeline: &ActivityTimeline,
    ctx: &RecordingContext,
    config: &PipelineConfig,
) -> Result<Vec<DiarizedUtterance>> {
    let use_words = match config.assignment {
        AssignmentStrategy::Auto => transcript.has_speaker_ids(),
        AssignmentStrategy::WordVote => {
            if !transcript.has_speaker_ids() {
                return Err(PipelineError::InvalidInput(
                    "word-vote assignment requested but the transcript carries no \
                     word-level speaker ids"
                        .to_string(),
                ));
            }
            true
        }
        AssignmentStrategy::SentenceMidpoint => false,
    };

    let utterances = match (use_words, transcript.words.as_deref()) {
        (true, Some(word_stream)) => words::assign_by_words(word_stream, timeline, ctx, config),
        _ => segments::assign_by_segments(&transcript.segments, timeline, ctx, config),
    };

    debug!(
        "Assigned speakers via {} path: {} utterances",
        if use_words { "word-vote" } else { "sentence-midpoint" },
        utterances.len()
    );

    Ok(utterances)
}

/// Merge consecutive utterances that share a speaker and sit closer together
/// than `gap_seconds`. Idempotent; also collapses runs of whitespace in every
/// emitted text.
pub fn merge_consecutive(
    utterances: Vec<DiarizedUtterance>,
    gap_seconds: f64,
) -> Vec<DiarizedUtterance> {
    let mut merged: Vec<DiarizedUtterance> = Vec::with_capacity(utterances.len());

    for mut utterance in utterances {
        utterance.text = normalize_whitespace(&utterance.text);
        if utterance.text.is_empty() {
            continue;
        }

        let mergeable = merged.last().is_some_and(|last| {
            let gap = (utterance.start - last.end)
                .num_microseconds()
                .map(|us| us as f64 / 1_000_000.0)
                .unwrap_or(f64::MAX);
            last.speaker == utterance.speaker && gap < gap_seconds
        });

        if mergeable {
            if let Some(last) = merged.last_mut() {
                last.text.push(' ');
                last.text.push_str(&utterance.text);
                if utterance.end > last.end {
                    last.end = utterance.end;
                }
            }
        } else {
            merged.push(utterance);
        }
    }

    merged
}

/// Collapse every run of whitespace to a single space.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clamp a relative interval into the tolerated recording window
/// (`[0, duration + 1 s]`), preserving ordering.
pub(crate) fn clamp_to_window(ctx: &RecordingContext, start_rel: f64, end_rel: f64) -> (f64, f64) {
    let limit = ctx.duration_seconds + 1.0;
    let start = start_rel.clamp(0.0, limit);
    let end = end_rel.clamp(start, limit);
    (start, end)
}
