//! One-shot pipeline: recording hand-off in, diarized transcript out.
//!
//! The surrounding recorder hands over `(audio, recording context, activity
//! log)` once capture ends; everything after that is this module's job:
//! chunked transcription, normalization, speaker assignment, and the optional
//! TL;DR. A fresh [`Pipeline`] value is built per recording; it owns no
//! global state.

use crate::audio::AudioSource;
use crate::config::PipelineConfig;
use crate::diarize::{self, DiarizedTranscript, DiarizedUtterance};
use crate::error::{PipelineError, Result};
use crate::stt::{ChunkedTranscriber, SttClient};
use crate::summary::Summarizer;
use crate::timeline::{ActivityEvent, ActivityTimeline, RecordingContext};
use crate::transcript::NormalizedTranscript;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Diarized-transcript construction pipeline for a single recording.
pub struct Pipeline {
    config: PipelineConfig,
    stt: Arc<dyn SttClient>,
    summarizer: Option<Summarizer>,
}

impl Pipeline {
    /// Create a pipeline around an STT client. Validates the configuration.
    pub fn new(config: PipelineConfig, stt: Arc<dyn SttClient>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stt,
            summarizer: None,
        })
    }

    /// Attach a summariser; without one `tldr` stays `None`.
    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Run the whole pipeline for one recording.
    pub async fn run(
        &self,
        audio: &dyn AudioSource,
        events: &[ActivityEvent],
        ctx: &RecordingContext,
        cancel: &CancellationToken,
    ) -> Result<DiarizedTranscript> {
        if ctx.duration_seconds < 0.0 || !ctx.duration_seconds.is_finite() {
            return Err(PipelineError::InvalidInput(format!(
                "recording duration must be a non-negative number, got {}",
                ctx.duration_seconds
            )));
        }

        let transcriber = ChunkedTranscriber::new(self.stt.clone(), self.config.clone());
        let normalized = transcriber.transcribe(audio, cancel).await?;

        self.assemble(&normalized, events, ctx, cancel).await
    }

    /// Diarize an already-normalized transcript (the post-STT half of
    /// [`Pipeline::run`]).
    pub async fn assemble(
        &self,
        normalized: &NormalizedTranscript,
        events: &[ActivityEvent],
        ctx: &RecordingContext,
        cancel: &CancellationToken,
    ) -> Result<DiarizedTranscript> {
        let timeline =
            ActivityTimeline::build(events, ctx, self.config.speaker_offset_seconds)?;
        let utterances = diarize::assign(normalized, &timeline, ctx, &self.config)?;
        check_utterance_order(&utterances)?;

        let tldr = match &self.summarizer {
            Some(summarizer) => summarizer.tldr(&utterances, &self.config, cancel).await,
            None => None,
        };

        info!(
            "Recording diarized: {} utterances, {} chars, tldr={}",
            utterances.len(),
            normalized.full_text.len(),
            tldr.is_some()
        );

        Ok(DiarizedTranscript {
            full_text: normalized.full_text.clone(),
            utterances,
            tldr,
        })
    }
}

/// Final sanity check on utterance ordering before the result leaves the
/// pipeline.
fn check_utterance_order(utterances: &[DiarizedUtterance]) -> Result<()> {
    for pair in utterances.windows(2) {
        if pair[1].start < pair[0].start {
            error!(
                "utterances out of order: {} before {}",
                pair[1].start, pair[0].start
            );
            return Err(PipelineError::Internal(
                "utterances assembled out of order".to_string(),
            ));
        }
    }
    for utterance in utterances {
        if utterance.end < utterance.start {
            error!("utterance ends before it starts: {:?}", utterance.start);
            return Err(PipelineError::Internal(
                "utterance ends before it starts".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::{RawSegment, RawTranscription};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct StubStt;

    #[async_trait]
    impl SttClient for StubStt {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn transcribe(&self, _audio: Vec<u8>, _file_name: &str) -> Result<RawTranscription> {
            Ok(RawTranscription {
                text: "hello world goodbye".to_string(),
                segments: Some(vec![
                    RawSegment {
                        text: "hello world".to_string(),
                        start: 0.0,
                        end: 3.0,
                    },
                    RawSegment {
                        text: "goodbye".to_string(),
                        start: 3.0,
                        end: 5.0,
                    },
                ]),
                words: None,
            })
        }
    }

    fn ctx() -> RecordingContext {
        RecordingContext::new(Utc.with_ymd_and_hms(2025, 2, 19, 8, 29, 10).unwrap(), 6.0)
    }

    fn events(ctx: &RecordingContext) -> Vec<ActivityEvent> {
        vec![
            ActivityEvent {
                at: ctx.absolute(0.0),
                speakers: vec!["Ada".to_string()],
            },
            ActivityEvent {
                at: ctx.absolute(3.0),
                speakers: vec!["Ben".to_string()],
            },
            ActivityEvent {
                at: ctx.absolute(5.0),
                speakers: vec![],
            },
        ]
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let result = Pipeline::new(
            PipelineConfig {
                duration_ratio: 0.5,
                ..Default::default()
            },
            Arc::new(StubStt),
        );
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_assemble_end_to_end() {
        let ctx = ctx();
        let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(StubStt)).unwrap();
        let raw = StubStt.transcribe(Vec::new(), "recording.wav").await.unwrap();
        let normalized =
            crate::transcript::normalize(&raw, 0.0, &PipelineConfig::default()).unwrap();

        let result = pipeline
            .assemble(&normalized, &events(&ctx), &ctx, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.full_text, "hello world goodbye");
        assert_eq!(result.utterances.len(), 2);
        assert_eq!(result.utterances[0].speaker, "Ada");
        assert_eq!(result.utterances[0].start, ctx.absolute(0.0));
        assert_eq!(result.utterances[1].speaker, "Ben");
        assert_eq!(result.utterances[1].end, ctx.absolute(5.0));
        assert!(result.tldr.is_none());
    }

    #[tokio::test]
    async fn test_negative_duration_rejected() {
        let ctx = RecordingContext::new(
            Utc.with_ymd_and_hms(2025, 2, 19, 8, 29, 10).unwrap(),
            -1.0,
        );
        let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(StubStt)).unwrap();

        struct NoAudio;
        impl AudioSource for NoAudio {
            fn byte_len(&self) -> u64 {
                1
            }
            fn duration_ms(&self) -> u64 {
                1
            }
            fn read_all(&self) -> Result<Vec<u8>> {
                Ok(vec![0])
            }
            fn read_range(&self, _: u64, _: u64) -> Result<Vec<u8>> {
                Ok(vec![0])
            }
        }

        let err = pipeline
            .run(&NoAudio, &[], &ctx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_output_serialization_shape() {
        let ctx = ctx();
        let transcript = DiarizedTranscript {
            full_text: "hello world".to_string(),
            utterances: vec![DiarizedUtterance {
                speaker: "Ada".to_string(),
                text: "hello world".to_string(),
                start: ctx.absolute(0.0),
                end: ctx.absolute(3.0),
            }],
            tldr: None,
        };
        let json = serde_json::to_value(&transcript).unwrap();
        assert_eq!(json["text"], "hello world");
        assert_eq!(json["diarized"][0]["speaker"], "Ada");
        assert!(json["diarized"][0]["start"]
            .as_str()
            .unwrap()
            .starts_with("2025-02-19T08:29:10"));
        assert!(json["tldr"].is_null());
    }

    #[test]
    fn test_order_check_flags_regression() {
        let ctx = ctx();
        let out_of_order = vec![
            DiarizedUtterance {
                speaker: "Ada".to_string(),
                text: "second".to_string(),
                start: ctx.absolute(4.0),
                end: ctx.absolute(5.0),
            },
            DiarizedUtterance {
                speaker: "Ben".to_string(),
                text: "first".to_string(),
                start: ctx.absolute(0.0),
                end: ctx.absolute(1.0),
            },
        ];
        assert!(matches!(
            check_utterance_order(&out_of_order),
            Err(PipelineError::Internal(_))
        ));
    }
}
