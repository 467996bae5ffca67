//! Diarized-transcript construction core for meeting recordings.
//!
//! Given a finite audio blob, the instant recording started, and the
//! recorder's log of who was marked active when, this crate produces a
//! diarized transcript: ordered utterances with speaker labels and absolute
//! timestamps, plus an optional TL;DR from a chat-completion provider.
//!
//! The interesting work is temporal alignment: the speech-to-text timings and
//! the speaker-activity events come from independent clocks at different
//! granularities, and audio above the provider's upload cap has to be cut
//! into chunks and stitched back together on a single timeline.
//!
//! ```ignore
//! use huddlescribe::{Pipeline, PipelineConfig, WavAudio};
//! use huddlescribe::stt::{HttpSttClient, SttConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let stt = Arc::new(HttpSttClient::new(SttConfig {
//!     api_key: "...".into(),
//!     ..Default::default()
//! })?);
//! let pipeline = Pipeline::new(PipelineConfig::default(), stt)?;
//!
//! let audio = WavAudio::from_bytes(wav_bytes)?;
//! let result = pipeline
//!     .run(&audio, &activity_events, &recording, &CancellationToken::new())
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! ```

pub mod audio;
pub mod config;
pub mod diarize;
pub mod error;
pub mod pipeline;
pub mod stt;
pub mod summary;
pub mod timeline;
pub mod transcript;

// Re-export the types most callers touch.
pub use audio::{AudioSource, WavAudio};
pub use config::{AssignmentStrategy, PipelineConfig};
pub use diarize::{DiarizedTranscript, DiarizedUtterance, UNKNOWN_SPEAKER};
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
pub use summary::Summarizer;
pub use timeline::{ActivityEvent, RecordingContext, SpeakerBlock};
pub use transcript::NormalizedTranscript;
