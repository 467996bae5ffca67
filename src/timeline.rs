//! Activity timeline: who was marked active, and when.
//!
//! The recorder watches the meeting client's UI and emits a sparse stream of
//! [`ActivityEvent`]s, each a snapshot of the currently active speakers. This
//! module folds that stream into non-overlapping per-speaker blocks relative
//! to the recording start, and answers "who was active at instant t" queries
//! for the speaker assigner.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Immutable facts about one recording, created when capture begins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecordingContext {
    /// Wall-clock instant at which audio capture started.
    pub recording_start: DateTime<Utc>,
    /// Total length of the captured audio, in seconds.
    pub duration_seconds: f64,
}

impl RecordingContext {
    pub fn new(recording_start: DateTime<Utc>, duration_seconds: f64) -> Self {
        Self {
            recording_start,
            duration_seconds,
        }
    }

    /// Seconds elapsed from the recording start to `at`. Negative when `at`
    /// precedes the start.
    pub fn rel_seconds(&self, at: DateTime<Utc>) -> f64 {
        (at - self.recording_start)
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or_else(|| (at - self.recording_start).num_seconds() as f64)
    }

    /// Absolute instant for a relative offset in seconds.
    pub fn absolute(&self, rel: f64) -> DateTime<Utc> {
        self.recording_start + Duration::microseconds((rel * 1_000_000.0).round() as i64)
    }
}

/// A timestamped snapshot of the currently active speakers.
///
/// An empty `speakers` list means silence since the previous event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// When the snapshot was taken.
    #[serde(alias = "timestamp")]
    pub at: DateTime<Utc>,
    /// Display names of everyone marked active at `at`.
    pub speakers: Vec<String>,
}

/// A maximal interval during which one display name was continuously active.
///
/// Blocks for the same speaker never overlap; blocks for different speakers
/// may (simultaneous speech).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerBlock {
    pub speaker: String,
    /// Seconds from recording start.
    pub start_rel: f64,
    /// Seconds from recording start; always greater than `start_rel`.
    pub end_rel: f64,
}

impl SpeakerBlock {
    /// Overlap duration between this block and `[start, end]`, in seconds.
    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        (self.end_rel.min(end) - self.start_rel.max(start)).max(0.0)
    }
}

/// Derived view of the activity log for one recording.
///
/// Holds the speaker blocks (with the configured offset already applied) plus
/// the raw non-empty event instants used for point-in-time lookups.
#[derive(Debug, Clone, Default)]
pub struct ActivityTimeline {
    blocks: Vec<SpeakerBlock>,
    /// (rel_seconds, first speaker) of every event with a non-empty speaker
    /// list, in event order. Not offset-adjusted; lookups take the offset.
    samples: Vec<(f64, String)>,
    /// Display name -> order of first appearance in the log.
    first_seen: HashMap<String, usize>,
}

impl ActivityTimeline {
    /// Fold an ordered activity-event stream into a timeline.
    ///
    /// `offset_seconds` is added to every block boundary; it models a known
    /// latency between the activity-event clock and the audio clock. Events
    /// must be ordered by timestamp; a decreasing timestamp is an input
    /// error. Events before the recording start clamp to 0.
    pub fn build(
        events: &[ActivityEvent],
        ctx: &RecordingContext,
        offset_seconds: f64,
    ) -> Result<Self> {
        let mut blocks = Vec::new();
        let mut samples = Vec::new();
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        // Activation-ordered so closing order (and therefore sort stability
        // for identical starts) is deterministic.
        let mut active: Vec<(String, f64)> = Vec::new();
        let mut prev_at: Option<DateTime<Utc>> = None;
        let mut last_rel = 0.0_f64;

        for event in events {
            if let Some(prev) = prev_at {
                if event.at < prev {
                    return Err(PipelineError::InvalidInput(format!(
                        "activity events out of order: {} after {}",
                        event.at, prev
                    )));
                }
            }
            prev_at = Some(event.at);

            let rel = ctx.rel_seconds(event.at);
            last_rel = last_rel.max(rel);

            for name in &event.speakers {
                let next_rank = first_seen.len();
                first_seen.entry(name.clone()).or_insert(next_rank);
            }
            if let Some(first) = event.speakers.first() {
                samples.push((rel, first.clone()));
            }

            let clamped = rel.max(0.0);

            // Close speakers absent from this snapshot.
            active.retain(|(name, start)| {
                if event.speakers.iter().any(|s| s == name) {
                    true
                } else {
                    if clamped > *start {
                        blocks.push(SpeakerBlock {
                            speaker: name.clone(),
                            start_rel: *start,
                            end_rel: clamped,
                        });
                    }
                    false
                }
            });

            // Open speakers new to this snapshot.
            for name in &event.speakers {
                if !active.iter().any(|(n, _)| n == name) {
                    active.push((name.clone(), clamped));
                }
            }
        }

        // Anyone still marked active is closed at the end of the recording,
        // or at the last event if the clocks disagree.
        let close_at = ctx.duration_seconds.max(last_rel).max(0.0);
        for (name, start) in active {
            if close_at > start {
                blocks.push(SpeakerBlock {
                    speaker: name,
                    start_rel: start,
                    end_rel: close_at,
                });
            }
        }

        blocks.sort_by(|a, b| a.start_rel.total_cmp(&b.start_rel));

        if offset_seconds != 0.0 {
            for block in &mut blocks {
                block.start_rel += offset_seconds;
                block.end_rel += offset_seconds;
            }
        }

        debug!(
            "Activity timeline: {} events -> {} blocks, {} named speakers",
            events.len(),
            blocks.len(),
            first_seen.len()
        );

        Ok(Self {
            blocks,
            samples,
            first_seen,
        })
    }

    /// Speaker blocks ordered by start, offset applied.
    pub fn blocks(&self) -> &[SpeakerBlock] {
        &self.blocks
    }

    /// First speaker of the most recent non-empty event at or before `rel`,
    /// with `offset_seconds` added to the event clock.
    pub fn speaker_at(&self, rel: f64, offset_seconds: f64) -> Option<&str> {
        self.samples
            .iter()
            .rev()
            .find(|(event_rel, _)| event_rel + offset_seconds <= rel)
            .map(|(_, name)| name.as_str())
    }

    /// Order of first appearance in the activity log; unseen names sort last.
    pub fn appearance_rank(&self, name: &str) -> usize {
        self.first_seen.get(name).copied().unwrap_or(usize::MAX)
    }

    /// True when the log never named a speaker.
    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }
}
