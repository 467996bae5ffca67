//! End-to-end pipeline tests with scripted providers.
//!
//! These drive the public API the way the surrounding recorder does: one
//! hand-off of (audio, recording context, activity log) per recording,
//! scripted STT/LLM responses standing in for the real providers.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use huddlescribe::stt::{RawSegment, RawTranscription, RawWord, SttClient};
use huddlescribe::summary::{
    LlmProvider, Message, ProviderError, ProviderResponse, Summarizer,
};
use huddlescribe::transcript::WordKind;
use huddlescribe::{
    ActivityEvent, AudioSource, Pipeline, PipelineConfig, RecordingContext, Result,
    UNKNOWN_SPEAKER,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory stand-in for the recorder's audio blob.
struct FakeAudio {
    byte_len: u64,
    duration_ms: u64,
}

impl AudioSource for FakeAudio {
    fn byte_len(&self) -> u64 {
        self.byte_len
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    fn read_all(&self) -> Result<Vec<u8>> {
        Ok(vec![0; self.byte_len as usize])
    }

    fn read_range(&self, start_ms: u64, end_ms: u64) -> Result<Vec<u8>> {
        let bytes_per_ms = (self.byte_len / self.duration_ms).max(1);
        Ok(vec![0; ((end_ms - start_ms) * bytes_per_ms) as usize])
    }
}

/// STT client answering from a script keyed by uploaded file name.
struct ScriptedStt {
    script: Box<dyn Fn(&str) -> RawTranscription + Send + Sync>,
}

impl ScriptedStt {
    fn constant(raw: RawTranscription) -> Self {
        Self {
            script: Box::new(move |_| raw.clone()),
        }
    }

    fn by_name(script: impl Fn(&str) -> RawTranscription + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
        }
    }
}

#[async_trait]
impl SttClient for ScriptedStt {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn transcribe(&self, _audio: Vec<u8>, file_name: &str) -> Result<RawTranscription> {
        Ok((self.script)(file_name))
    }
}

/// LLM provider that always answers with the same summary.
struct ScriptedLlm {
    response: String,
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn chat(&self, _messages: &[Message]) -> std::result::Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            content: self.response.clone(),
            model: "scripted-model".to_string(),
            tokens_used: None,
        })
    }
}

fn recording(duration_seconds: f64) -> RecordingContext {
    RecordingContext::new(
        Utc.with_ymd_and_hms(2025, 2, 19, 8, 29, 10).unwrap(),
        duration_seconds,
    )
}

fn activity(ctx: &RecordingContext, entries: &[(f64, &[&str])]) -> Vec<ActivityEvent> {
    entries
        .iter()
        .map(|(rel, speakers)| ActivityEvent {
            at: ctx.absolute(*rel),
            speakers: speakers.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

fn small_audio() -> FakeAudio {
    FakeAudio {
        byte_len: 1_000,
        duration_ms: 10_000,
    }
}

fn segment_response(segments: &[(&str, f64, f64)]) -> RawTranscription {
    RawTranscription {
        text: segments
            .iter()
            .map(|(t, _, _)| *t)
            .collect::<Vec<_>>()
            .join(" "),
        segments: Some(
            segments
                .iter()
                .map(|(text, start, end)| RawSegment {
                    text: text.to_string(),
                    start: *start,
                    end: *end,
                })
                .collect(),
        ),
        words: None,
    }
}

#[tokio::test]
async fn test_two_segments_follow_the_activity_log() -> anyhow::Result<()> {
    init_tracing();
    let ctx = recording(6.0);
    let events = activity(&ctx, &[(0.0, &["Ada"]), (3.0, &["Ben"]), (5.0, &[])]);
    let stt = ScriptedStt::constant(segment_response(&[
        ("hello world", 0.0, 3.0),
        ("goodbye", 3.0, 5.0),
    ]));

    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(stt))?;
    let result = pipeline
        .run(&small_audio(), &events, &ctx, &CancellationToken::new())
        .await?;

    assert_eq!(result.utterances.len(), 2);
    assert_eq!(result.utterances[0].speaker, "Ada");
    assert_eq!(result.utterances[0].text, "hello world");
    assert_eq!(result.utterances[0].start, ctx.absolute(0.0));
    assert_eq!(result.utterances[0].end, ctx.absolute(3.0));
    assert_eq!(result.utterances[1].speaker, "Ben");
    assert_eq!(result.utterances[1].text, "goodbye");
    assert_eq!(result.utterances[1].start, ctx.absolute(3.0));
    assert_eq!(result.utterances[1].end, ctx.absolute(5.0));
    assert!(result.tldr.is_none());
    Ok(())
}

#[tokio::test]
async fn test_unterminated_segment_is_one_utterance() {
    let ctx = recording(6.0);
    let events = activity(&ctx, &[(0.0, &["Ada"]), (3.0, &["Ben"]), (5.0, &[])]);
    let stt = ScriptedStt::constant(segment_response(&[("hello world goodbye", 0.0, 5.0)]));

    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(stt)).unwrap();
    let result = pipeline
        .run(&small_audio(), &events, &ctx, &CancellationToken::new())
        .await
        .unwrap();

    // No terminal punctuation: one sentence whose midpoint (2.5 s) is Ada's.
    assert_eq!(result.utterances.len(), 1);
    assert_eq!(result.utterances[0].speaker, "Ada");
    assert_eq!(result.utterances[0].text, "hello world goodbye");
    assert_eq!(result.utterances[0].start, ctx.absolute(0.0));
    assert_eq!(result.utterances[0].end, ctx.absolute(5.0));
}

#[tokio::test]
async fn test_word_level_ids_map_to_display_names() {
    let ctx = recording(8.0);
    let events = activity(&ctx, &[(0.0, &["Ada"]), (3.0, &["Ben"]), (7.0, &[])]);
    let word = |text: &str, start: f64, end: f64, id: &str| RawWord {
        kind: WordKind::Word,
        text: text.to_string(),
        start,
        end,
        speaker_id: Some(id.to_string()),
    };
    let stt = ScriptedStt::constant(RawTranscription {
        text: "yes no maybe so".to_string(),
        segments: None,
        words: Some(vec![
            word("yes", 0.0, 1.0, "X"),
            word("no", 1.1, 2.4, "X"),
            word("maybe", 3.2, 4.4, "Y"),
            word("so", 4.5, 5.6, "Y"),
        ]),
    });

    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(stt)).unwrap();
    let result = pipeline
        .run(&small_audio(), &events, &ctx, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.utterances.len(), 2);
    assert_eq!(result.utterances[0].speaker, "Ada");
    assert_eq!(result.utterances[0].text, "yes no");
    assert_eq!(result.utterances[1].speaker, "Ben");
    assert_eq!(result.utterances[1].text, "maybe so");
}

#[tokio::test]
async fn test_dominant_overlap_reassigns_the_segment() {
    let ctx = recording(6.0);
    let events = activity(
        &ctx,
        &[
            (0.0, &["Ada"]),
            (0.0, &["Ada", "Ben"]),
            (4.0, &["Ben"]),
            (6.0, &[]),
        ],
    );
    let stt = ScriptedStt::constant(segment_response(&[("overlap text", 0.0, 6.0)]));

    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(stt)).unwrap();
    let result = pipeline
        .run(&small_audio(), &events, &ctx, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.utterances.len(), 1);
    assert_eq!(result.utterances[0].speaker, "Ben");
}

#[tokio::test]
async fn test_oversize_audio_is_chunked_and_restitched() {
    let ctx = recording(600.0);
    let events = activity(&ctx, &[(0.0, &["Ada"]), (599.0, &[])]);
    // Twice the cap over ten minutes: exactly two five-minute chunks.
    let stt = ScriptedStt::by_name(|file_name| match file_name {
        "chunk-000.wav" => segment_response(&[("first half", 0.0, 4.0)]),
        "chunk-001.wav" => segment_response(&[("second half", 1.0, 5.0)]),
        other => panic!("unexpected upload: {}", other),
    });
    let config = PipelineConfig {
        stt_max_bytes: 1_000,
        ..Default::default()
    };

    let pipeline = Pipeline::new(config, Arc::new(stt)).unwrap();
    let audio = FakeAudio {
        byte_len: 2_000,
        duration_ms: 600_000,
    };
    let result = pipeline
        .run(&audio, &events, &ctx, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.full_text, "first half second half");
    assert_eq!(result.utterances.len(), 2);
    // The second chunk's utterance lands past recording start + 5 minutes.
    assert!(result.utterances[1].start >= ctx.absolute(300.0));
    assert_eq!(result.utterances[1].start, ctx.absolute(301.0));
}

#[tokio::test]
async fn test_short_transcript_gets_a_tldr_in_one_call() {
    let ctx = recording(10.0);
    let events = activity(&ctx, &[(0.0, &["Ada"]), (9.0, &[])]);
    let stt = ScriptedStt::constant(segment_response(&[(
        "we agreed on the budget and the launch date",
        0.0,
        9.0,
    )]));
    let summarizer = Summarizer::new(Box::new(ScriptedLlm {
        response: "\"Budget agreement, launch date.\"".to_string(),
    }));

    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(stt))
        .unwrap()
        .with_summarizer(summarizer);
    let result = pipeline
        .run(&small_audio(), &events, &ctx, &CancellationToken::new())
        .await
        .unwrap();

    let tldr = result.tldr.expect("tldr should be present");
    assert!(!tldr.is_empty());
    assert!(!tldr.starts_with('"'));
    assert!(!tldr.ends_with('"'));
    // Bounded by the summariser's output cap (300 tokens at 2.5 chars each).
    assert!(tldr.chars().count() <= 300 * 25 / 10);
}

#[tokio::test]
async fn test_empty_activity_log_still_produces_a_transcript() {
    let ctx = recording(6.0);
    let stt = ScriptedStt::constant(segment_response(&[
        ("nobody logged in", 0.0, 3.0),
        ("still talking", 3.2, 5.0),
    ]));

    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(stt)).unwrap();
    let result = pipeline
        .run(&small_audio(), &[], &ctx, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.full_text.is_empty());
    assert!(!result.utterances.is_empty());
    assert!(result
        .utterances
        .iter()
        .all(|u| u.speaker == UNKNOWN_SPEAKER));
}

#[tokio::test]
async fn test_single_speaker_merges_to_one_utterance() {
    let ctx = recording(10.0);
    let events = activity(&ctx, &[(0.0, &["Ada"]), (9.5, &[])]);
    let stt = ScriptedStt::constant(segment_response(&[
        ("First point.", 0.0, 3.0),
        ("Second point.", 3.1, 6.0),
        ("Third point.", 6.2, 9.0),
    ]));

    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(stt)).unwrap();
    let result = pipeline
        .run(&small_audio(), &events, &ctx, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.utterances.len(), 1);
    assert_eq!(result.utterances[0].speaker, "Ada");
    assert_eq!(
        result.utterances[0].text,
        "First point. Second point. Third point."
    );
}

#[tokio::test]
async fn test_no_tokens_are_lost_or_invented() {
    let ctx = recording(12.0);
    let events = activity(&ctx, &[(0.0, &["Ada"]), (5.0, &["Ben"]), (11.0, &[])]);
    let stt = ScriptedStt::constant(segment_response(&[
        ("The quarterly numbers look fine.", 0.0, 4.0),
        ("Shipping slips a week. Marketing is ready.", 4.2, 9.0),
        ("good", 9.1, 10.0),
    ]));

    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(stt)).unwrap();
    let result = pipeline
        .run(&small_audio(), &events, &ctx, &CancellationToken::new())
        .await
        .unwrap();

    let mut from_full: Vec<&str> = result.full_text.split_whitespace().collect();
    let mut from_utterances: Vec<&str> = result
        .utterances
        .iter()
        .flat_map(|u| u.text.split_whitespace())
        .collect();
    from_full.sort_unstable();
    from_utterances.sort_unstable();
    assert_eq!(from_full, from_utterances);

    // Monotone, non-overlapping, in-window.
    for pair in result.utterances.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
    let limit = ctx.absolute(ctx.duration_seconds + 1.0);
    for u in &result.utterances {
        assert!(u.start < u.end);
        assert!(u.start >= ctx.recording_start);
        assert!(u.end <= limit);
    }
}

#[tokio::test]
async fn test_resplit_produces_the_same_transcript() {
    let ctx = recording(600.0);
    let events = activity(&ctx, &[(0.0, &["Ada"]), (580.0, &[])]);

    // One provider answering both ways: whole-file, or per five-minute chunk.
    let whole = ScriptedStt::constant(segment_response(&[
        ("alpha beta", 10.0, 14.0),
        ("gamma delta", 310.0, 314.0),
    ]));
    let split = ScriptedStt::by_name(|name| match name {
        "recording.wav" => unreachable!("oversize audio must be chunked"),
        "chunk-000.wav" => segment_response(&[("alpha beta", 10.0, 14.0)]),
        "chunk-001.wav" => segment_response(&[("gamma delta", 10.0, 14.0)]),
        other => panic!("unexpected upload: {}", other),
    });

    let below_cap = Pipeline::new(PipelineConfig::default(), Arc::new(whole)).unwrap();
    let above_cap = Pipeline::new(
        PipelineConfig {
            stt_max_bytes: 1_000,
            ..Default::default()
        },
        Arc::new(split),
    )
    .unwrap();

    let small = FakeAudio {
        byte_len: 900,
        duration_ms: 600_000,
    };
    let large = FakeAudio {
        byte_len: 2_000,
        duration_ms: 600_000,
    };
    let cancel = CancellationToken::new();

    let direct = below_cap.run(&small, &events, &ctx, &cancel).await.unwrap();
    let stitched = above_cap.run(&large, &events, &ctx, &cancel).await.unwrap();

    assert_eq!(direct.full_text, stitched.full_text);
    let texts = |t: &huddlescribe::DiarizedTranscript| {
        t.utterances
            .iter()
            .map(|u| (u.speaker.clone(), u.text.clone(), u.start, u.end))
            .collect::<Vec<_>>()
    };
    assert_eq!(texts(&direct), texts(&stitched));
}

#[tokio::test]
async fn test_speakers_are_timeline_names_or_unknown() {
    let ctx = recording(20.0);
    let events = activity(
        &ctx,
        &[(0.0, &["Ada"]), (6.0, &["Ben"]), (12.0, &[]), (14.0, &["Cleo"])],
    );
    let stt = ScriptedStt::constant(segment_response(&[
        ("One topic. Another topic.", 0.0, 10.0),
        ("A late remark", 14.5, 18.0),
    ]));

    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(stt)).unwrap();
    let result = pipeline
        .run(&small_audio(), &events, &ctx, &CancellationToken::new())
        .await
        .unwrap();

    let known: HashSet<&str> = ["Ada", "Ben", "Cleo", UNKNOWN_SPEAKER].into();
    for u in &result.utterances {
        assert!(known.contains(u.speaker.as_str()), "bad label {}", u.speaker);
    }
}
