//! Sentence-midpoint speaker assignment.
//!
//! Fallback for providers that deliver only segment timings. Segments are
//! split into sentences, each sentence gets a proportional slice of the
//! segment's time, and the activity log is asked who was speaking at the
//! slice's midpoint. Block-containment rules catch sentences the log cannot
//! place, and a segment flips wholesale to another speaker when that speaker
//! dominates its time span.

use super::{clamp_to_window, merge_consecutive, DiarizedUtterance, UNKNOWN_SPEAKER};
use crate::config::PipelineConfig;
use crate::timeline::{ActivityTimeline, RecordingContext, SpeakerBlock};
use crate::transcript::SttSegment;
use tracing::debug;

/// Assign speakers sentence by sentence and fold into utterances.
pub fn assign_by_segments(
    segments: &[SttSegment],
    timeline: &ActivityTimeline,
    ctx: &RecordingContext,
    config: &PipelineConfig,
) -> Vec<DiarizedUtterance> {
    let mut utterances = Vec::new();

    for segment in segments {
        let fallback = containment_label(timeline.blocks(), segment.start_rel, segment.end_rel);
        let overlaps = speaker_overlaps(timeline.blocks(), segment.start_rel, segment.end_rel);

        for (text, start_rel, end_rel) in allocate_sentences(segment) {
            let midpoint = (start_rel + end_rel) / 2.0;
            let mut speaker = timeline
                .speaker_at(midpoint, config.speaker_offset_seconds)
                .or(fallback)
                .unwrap_or(UNKNOWN_SPEAKER)
                .to_string();

            speaker = reassign_if_dominated(speaker, &overlaps, config.duration_ratio);

            let (start_rel, end_rel) = clamp_to_window(ctx, start_rel, end_rel);
            utterances.push(DiarizedUtterance {
                speaker,
                text,
                start: ctx.absolute(start_rel),
                end: ctx.absolute(end_rel),
            });
        }
    }

    debug!(
        "Sentence-midpoint assignment: {} segments -> {} raw utterances",
        segments.len(),
        utterances.len()
    );

    merge_consecutive(utterances, config.segment_merge_gap_seconds)
}

/// Split a segment into sentences and give each a proportional-by-length
/// slice of the segment's interval.
fn allocate_sentences(segment: &SttSegment) -> Vec<(String, f64, f64)> {
    let sentences = split_sentences(&segment.text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let total_chars: usize = sentences.iter().map(|s| s.chars().count()).sum();
    if total_chars == 0 {
        return Vec::new();
    }

    let duration = segment.end_rel - segment.start_rel;
    let mut allocated = Vec::with_capacity(sentences.len());
    let mut consumed = 0usize;
    for sentence in sentences {
        let chars = sentence.chars().count();
        let start_rel = segment.start_rel + duration * consumed as f64 / total_chars as f64;
        consumed += chars;
        let end_rel = segment.start_rel + duration * consumed as f64 / total_chars as f64;
        allocated.push((sentence, start_rel, end_rel));
    }
    allocated
}

/// Split on sentence-terminal punctuation followed by whitespace. Text
/// without a terminator stays one sentence.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Containment-based label for a whole segment, tried in order: a block
/// fully inside the segment, a block already running at the segment start,
/// a block starting inside the segment.
fn containment_label(blocks: &[SpeakerBlock], start: f64, end: f64) -> Option<&str> {
    blocks
        .iter()
        .find(|b| b.start_rel >= start && b.end_rel <= end)
        .or_else(|| {
            blocks
                .iter()
                .find(|b| b.start_rel <= start && b.end_rel >= start)
        })
        .or_else(|| {
            blocks
                .iter()
                .find(|b| b.start_rel >= start && b.start_rel <= end)
        })
        .map(|b| b.speaker.as_str())
}

/// Per-speaker overlap with `[start, end]`, ordered by each speaker's
/// earliest block start (the tie-break order for reassignment).
fn speaker_overlaps(blocks: &[SpeakerBlock], start: f64, end: f64) -> Vec<(String, f64)> {
    let mut overlaps: Vec<(String, f64)> = Vec::new();
    for block in blocks {
        let overlap = block.overlap(start, end);
        match overlaps.iter().position(|(name, _)| *name == block.speaker) {
            Some(i) => overlaps[i].1 += overlap,
            None => overlaps.push((block.speaker.clone(), overlap)),
        }
    }
    overlaps
}

/// Hand the sentence to another speaker when that speaker's overlap with the
/// segment is at least `ratio` times the assigned speaker's.
fn reassign_if_dominated(
    assigned: String,
    overlaps: &[(String, f64)],
    ratio: f64,
) -> String {
    if assigned == UNKNOWN_SPEAKER {
        return assigned;
    }
    let assigned_overlap = overlaps
        .iter()
        .find(|(name, _)| *name == assigned)
        .map(|(_, overlap)| *overlap)
        .unwrap_or(0.0);

    for (name, overlap) in overlaps {
        if *name != assigned && *overlap > 0.0 && *overlap >= assigned_overlap * ratio {
            return name.clone();
        }
    }
    assigned
}
