//! Word-vote speaker assignment.
//!
//! The provider already grouped words by voice (opaque `speaker_id`s); what
//! it cannot know is who those voices belong to. The activity log can: for
//! every sustained run of one speaker id, sample the log at several instants
//! and let each sample vote for a display name. The id maps to the name with
//! the most votes.

use super::{clamp_to_window, merge_consecutive, DiarizedUtterance, UNKNOWN_SPEAKER};
use crate::config::PipelineConfig;
use crate::timeline::{ActivityTimeline, RecordingContext};
use crate::transcript::{join_words, SttWord, WordKind};
use std::collections::HashMap;
use tracing::debug;

/// Minimum number of vote samples per provider segment.
const MIN_VOTE_SAMPLES: usize = 3;

/// Seconds of speech per additional vote sample.
const SAMPLE_SPACING_SECONDS: f64 = 0.5;

/// A sustained run of words the provider attributes to one speaker id.
#[derive(Debug)]
struct ProviderSegment<'a> {
    speaker_id: &'a str,
    start_rel: f64,
    end_rel: f64,
}

/// Assign display names to a word stream and fold it into utterances.
pub fn assign_by_words(
    words: &[SttWord],
    timeline: &ActivityTimeline,
    ctx: &RecordingContext,
    config: &PipelineConfig,
) -> Vec<DiarizedUtterance> {
    let speaker_map = build_speaker_map(words, timeline, config);
    debug!(
        "Mapped {} provider speaker ids to display names",
        speaker_map.len()
    );

    let mut utterances = Vec::new();
    let mut run_start_idx: Option<usize> = None;
    let mut current_name: Option<&str> = None;

    for (i, word) in words.iter().enumerate() {
        if word.kind != WordKind::Word {
            // Punctuation and spacing ride along with the surrounding words.
            continue;
        }
        let name = resolve(&speaker_map, word);
        match current_name {
            Some(active) if active == name => {}
            _ => {
                if let (Some(start_idx), Some(active)) = (run_start_idx, current_name) {
                    if let Some(utterance) = emit(&words[start_idx..i], active, ctx) {
                        utterances.push(utterance);
                    }
                }
                run_start_idx = Some(if current_name.is_none() { 0 } else { i });
                current_name = Some(name);
            }
        }
    }
    if let (Some(start_idx), Some(active)) = (run_start_idx, current_name) {
        if let Some(utterance) = emit(&words[start_idx..], active, ctx) {
            utterances.push(utterance);
        }
    }

    merge_consecutive(utterances, config.word_merge_gap_seconds)
}

/// Display name for a word's provider speaker id, or the unknown sentinel.
fn resolve<'m>(speaker_map: &'m HashMap<String, String>, word: &SttWord) -> &'m str {
    word.speaker_id
        .as_deref()
        .and_then(|id| speaker_map.get(id).map(String::as_str))
        .unwrap_or(UNKNOWN_SPEAKER)
}

fn emit(slice: &[SttWord], speaker: &str, ctx: &RecordingContext) -> Option<DiarizedUtterance> {
    let spoken: Vec<&SttWord> = slice.iter().filter(|w| w.kind == WordKind::Word).collect();
    let first = spoken.first()?;
    let last = spoken.last()?;
    let text = join_words(slice);
    if text.is_empty() {
        return None;
    }
    let (start_rel, end_rel) = clamp_to_window(ctx, first.start_rel, last.end_rel);
    Some(DiarizedUtterance {
        speaker: speaker.to_string(),
        text,
        start: ctx.absolute(start_rel),
        end: ctx.absolute(end_rel),
    })
}

/// Map provider speaker ids to display names by activity-log voting.
fn build_speaker_map(
    words: &[SttWord],
    timeline: &ActivityTimeline,
    config: &PipelineConfig,
) -> HashMap<String, String> {
    let segments = extract_provider_segments(words, config);

    // id -> (first-occurrence order of candidate names, name -> votes)
    let mut votes: HashMap<&str, HashMap<&str, usize>> = HashMap::new();
    let mut id_order: Vec<&str> = Vec::new();

    for segment in &segments {
        if !votes.contains_key(segment.speaker_id) {
            id_order.push(segment.speaker_id);
        }
        let tally = votes.entry(segment.speaker_id).or_default();

        let duration = segment.end_rel - segment.start_rel;
        let samples = MIN_VOTE_SAMPLES.max((duration / SAMPLE_SPACING_SECONDS) as usize);
        for k in 0..samples {
            let t = segment.start_rel + duration * k as f64 / (samples - 1) as f64;
            // The word clock and the event clock are compared directly here;
            // the configured block offset is a segment-path concern.
            if let Some(name) = timeline.speaker_at(t, 0.0) {
                *tally.entry(name).or_insert(0) += 1;
            }
        }
    }

    let mut map = HashMap::new();
    for id in id_order {
        let tally = &votes[id];
        let winner = tally.iter().max_by(|(a_name, a_votes), (b_name, b_votes)| {
            a_votes.cmp(b_votes).then_with(|| {
                // More votes wins; on a tie the earlier-appearing name does.
                timeline
                    .appearance_rank(b_name)
                    .cmp(&timeline.appearance_rank(a_name))
            })
        });
        if let Some((name, count)) = winner {
            debug!(
                "Speaker id '{}' -> '{}' ({} of {} votes)",
                id,
                name,
                count,
                tally.values().sum::<usize>()
            );
            map.insert(id.to_string(), name.to_string());
        }
    }
    map
}

/// Maximal runs of one speaker id, broken on long pauses; short runs carry
/// too little signal to vote with and are dropped.
fn extract_provider_segments<'a>(
    words: &'a [SttWord],
    config: &PipelineConfig,
) -> Vec<ProviderSegment<'a>> {
    let mut segments = Vec::new();
    let mut current: Option<ProviderSegment<'a>> = None;

    for word in words {
        if word.kind != WordKind::Word {
            continue;
        }
        let Some(speaker_id) = word.speaker_id.as_deref() else {
            continue;
        };

        let extends = current.as_ref().is_some_and(|seg| {
            seg.speaker_id == speaker_id
                && word.start_rel - seg.end_rel <= config.min_speaker_change_gap_seconds
        });
        if extends {
            if let Some(seg) = current.as_mut() {
                seg.end_rel = word.end_rel;
            }
        } else {
            if let Some(seg) = current.take() {
                if seg.end_rel - seg.start_rel >= config.min_utterance_seconds {
                    segments.push(seg);
                }
            }
            current = Some(ProviderSegment {
                speaker_id,
                start_rel: word.start_rel,
                end_rel: word.end_rel,
            });
        }
    }
    if let Some(seg) = current.take() {
        if seg.end_rel - seg.start_rel >= config.min_utterance_seconds {
            segments.push(seg);
        }
    }

    segments
}
