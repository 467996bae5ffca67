//! Normalized transcript model.
//!
//! STT providers answer in one of two shapes: segment-level timings, or
//! word-level timings with opaque speaker ids. Both are folded into a single
//! [`NormalizedTranscript`] here so the speaker assigner can dispatch on what
//! is actually present instead of probing raw JSON.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::stt::RawTranscription;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lexical class of a word-level entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordKind {
    /// Spoken word with meaningful timings.
    Word,
    /// Punctuation mark; appended to the previous word without a space.
    Punctuation,
    /// Whitespace entry; carries no text of its own.
    Spacing,
    /// Anything else the provider emits (audio events etc.); ignored.
    #[serde(other)]
    Other,
}

/// One word-level entry from the provider, timed relative to the recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttWord {
    pub kind: WordKind,
    pub text: String,
    pub start_rel: f64,
    pub end_rel: f64,
    /// Opaque provider speaker label ("speaker_0", ...), if diarization was
    /// requested from the provider.
    pub speaker_id: Option<String>,
}

/// A provider-chosen span of text, typically a sentence or clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SttSegment {
    pub text: String,
    pub start_rel: f64,
    pub end_rel: f64,
}

/// Provider-independent transcript: full text plus ordered segments, and the
/// word stream when the provider supplied one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTranscript {
    pub full_text: String,
    /// Non-overlapping, ordered by `start_rel`.
    pub segments: Vec<SttSegment>,
    /// Present only for word-level providers.
    pub words: Option<Vec<SttWord>>,
}

impl NormalizedTranscript {
    /// True when the word stream carries provider speaker ids.
    pub fn has_speaker_ids(&self) -> bool {
        self.words
            .as_ref()
            .map(|words| {
                words
                    .iter()
                    .any(|w| w.kind == WordKind::Word && w.speaker_id.is_some())
            })
            .unwrap_or(false)
    }
}

/// Normalize one raw provider response.
///
/// `offset_seconds` shifts every timing; the chunked driver uses it to place
/// a chunk's response on the recording clock before stitching.
pub fn normalize(
    raw: &RawTranscription,
    offset_seconds: f64,
    config: &PipelineConfig,
) -> Result<NormalizedTranscript> {
    let words = raw.words.as_ref().filter(|w| !w.is_empty()).map(|raw_words| {
        raw_words
            .iter()
            .map(|w| SttWord {
                kind: w.kind,
                text: w.text.clone(),
                start_rel: w.start + offset_seconds,
                end_rel: w.end + offset_seconds,
                speaker_id: w.speaker_id.clone(),
            })
            .collect::<Vec<_>>()
    });

    let mut segments = match (&words, &raw.segments) {
        (Some(words), _) => synthesize_segments(words, config.min_speaker_change_gap_seconds),
        (None, Some(raw_segments)) => raw_segments
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| SttSegment {
                text: s.text.trim().to_string(),
                start_rel: s.start + offset_seconds,
                end_rel: s.end + offset_seconds,
            })
            .collect(),
        (None, None) => {
            return Err(PipelineError::ProviderContract(
                "transcription carries neither segments nor words".to_string(),
            ))
        }
    };

    // Enforce segment ordering; providers occasionally emit sloppy bounds.
    segments.sort_by(|a, b| a.start_rel.total_cmp(&b.start_rel));
    let mut prev_end = f64::NEG_INFINITY;
    for segment in &mut segments {
        if segment.start_rel < prev_end {
            segment.start_rel = prev_end;
        }
        segment.end_rel = segment.end_rel.max(segment.start_rel);
        prev_end = segment.end_rel;
    }

    let full_text = if segments.is_empty() {
        raw.text.trim().to_string()
    } else {
        build_full_text(&segments, config.paragraph_break_gap_seconds)
    };

    debug!(
        "Normalized transcript: {} segments, {} words, {} chars",
        segments.len(),
        words.as_ref().map(|w| w.len()).unwrap_or(0),
        full_text.len()
    );

    Ok(NormalizedTranscript {
        full_text,
        segments,
        words,
    })
}

/// Stitch per-chunk transcripts back into one, in chunk order.
///
/// Each chunk's full text joins the next with a single space: the pause at a
/// chunk boundary is an artefact of the split, not a real paragraph break.
/// The word stream survives only when every chunk produced one; a provider
/// that switches shapes mid-recording falls back to the segment path.
pub fn concat(pieces: Vec<NormalizedTranscript>) -> NormalizedTranscript {
    let mut segments = Vec::new();
    let mut words: Option<Vec<SttWord>> = Some(Vec::new());
    let mut texts = Vec::new();

    for piece in pieces {
        if !piece.full_text.is_empty() {
            texts.push(piece.full_text);
        }
        segments.extend(piece.segments);
        match piece.words {
            Some(piece_words) => {
                if let Some(acc) = words.as_mut() {
                    acc.extend(piece_words);
                }
            }
            None => words = None,
        }
    }

    NormalizedTranscript {
        full_text: texts.join(" "),
        segments,
        words: words.filter(|w| !w.is_empty()),
    }
}

/// Join a word stream into display text: words separated by single spaces,
/// punctuation glued to the previous word, spacing entries dropped.
pub fn join_words(words: &[SttWord]) -> String {
    let mut out = String::new();
    for word in words {
        match word.kind {
            WordKind::Word => {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(word.text.trim());
            }
            WordKind::Punctuation => out.push_str(word.text.trim()),
            WordKind::Spacing | WordKind::Other => {}
        }
    }
    out
}

/// Group a word stream into segments: a segment extends while the provider
/// speaker id holds and the inter-word gap stays under `gap_seconds`.
fn synthesize_segments(words: &[SttWord], gap_seconds: f64) -> Vec<SttSegment> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut group_start = 0usize;
    let mut prev_word: Option<&SttWord> = None;

    for (i, word) in words.iter().enumerate() {
        if word.kind != WordKind::Word {
            continue;
        }
        if let Some(prev) = prev_word {
            let speaker_changed = prev.speaker_id != word.speaker_id;
            let gap = word.start_rel - prev.end_rel;
            if speaker_changed || gap >= gap_seconds {
                ranges.push((group_start, i));
                group_start = i;
            }
        }
        prev_word = Some(word);
    }
    if prev_word.is_some() {
        ranges.push((group_start, words.len()));
    }

    ranges
        .into_iter()
        .filter_map(|(lo, hi)| {
            let slice = &words[lo..hi];
            let spoken: Vec<&SttWord> =
                slice.iter().filter(|w| w.kind == WordKind::Word).collect();
            let first = spoken.first()?;
            let last = spoken.last()?;
            let text = join_words(slice);
            if text.is_empty() {
                return None;
            }
            Some(SttSegment {
                text,
                start_rel: first.start_rel,
                end_rel: last.end_rel,
            })
        })
        .collect()
}

/// Render segments as one string, breaking a paragraph where the pause is
/// long enough and the previous segment ended a sentence.
fn build_full_text(segments: &[SttSegment], paragraph_gap_seconds: f64) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        let text = segment.text.trim();
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            let prev = &segments[i - 1];
            let gap = segment.start_rel - prev.end_rel;
            let sentence_end = prev
                .text
                .trim_end()
                .ends_with(['.', '!', '?']);
            if gap >= paragraph_gap_seconds && sentence_end {
                out.push_str("\n\n");
            } else {
                out.push(' ');
            }
        }
        out.push_str(text);
    }
    out
}
