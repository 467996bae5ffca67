//! Audio blob abstraction for the chunked transcription driver.
//!
//! The recorder hands the core one finite audio blob. The driver only needs
//! three things from it: its size in bytes, its duration, and the ability to
//! cut a time range into a standalone blob the STT provider will accept.
//! [`WavAudio`] implements that for WAV, the container the recorders produce;
//! chunks are cut sample-accurately and re-emitted as self-contained WAV
//! files, so no re-encoding happens.

use crate::error::{PipelineError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use tracing::debug;

/// A finite audio blob that can be cut into time-contiguous chunks.
pub trait AudioSource: Send + Sync {
    /// Size of the whole blob in bytes, as the provider would receive it.
    fn byte_len(&self) -> u64;

    /// Total duration in milliseconds.
    fn duration_ms(&self) -> u64;

    /// The whole blob.
    fn read_all(&self) -> Result<Vec<u8>>;

    /// A standalone blob covering `[start_ms, end_ms)`.
    fn read_range(&self, start_ms: u64, end_ms: u64) -> Result<Vec<u8>>;
}

/// Decoded sample storage; preserved exactly as read so chunks can be
/// re-emitted with the original spec.
#[derive(Debug, Clone)]
enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl Samples {
    fn len(&self) -> usize {
        match self {
            Samples::Int(v) => v.len(),
            Samples::Float(v) => v.len(),
        }
    }
}

/// WAV-backed [`AudioSource`].
#[derive(Debug, Clone)]
pub struct WavAudio {
    byte_len: u64,
    bytes: Vec<u8>,
    spec: WavSpec,
    samples: Samples,
}

impl WavAudio {
    /// Parse a WAV blob. Fails with `InvalidInput` on anything unreadable.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut reader = WavReader::new(Cursor::new(&bytes))
            .map_err(|e| PipelineError::InvalidInput(format!("unreadable WAV audio: {}", e)))?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            SampleFormat::Int => Samples::Int(
                reader
                    .samples::<i32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| {
                        PipelineError::InvalidInput(format!("corrupt WAV samples: {}", e))
                    })?,
            ),
            SampleFormat::Float => Samples::Float(
                reader
                    .samples::<f32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| {
                        PipelineError::InvalidInput(format!("corrupt WAV samples: {}", e))
                    })?,
            ),
        };

        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(PipelineError::InvalidInput(
                "WAV header declares zero channels or sample rate".to_string(),
            ));
        }

        debug!(
            "Loaded WAV: {} bytes, {} Hz, {} channel(s), {} samples",
            bytes.len(),
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            byte_len: bytes.len() as u64,
            bytes,
            spec,
            samples,
        })
    }

    fn frames(&self) -> u64 {
        self.samples.len() as u64 / self.spec.channels as u64
    }

    fn frame_at_ms(&self, ms: u64) -> u64 {
        (ms * self.spec.sample_rate as u64 / 1000).min(self.frames())
    }

    fn write_frames(&self, start_frame: u64, end_frame: u64) -> Result<Vec<u8>> {
        let channels = self.spec.channels as usize;
        let lo = start_frame as usize * channels;
        let hi = end_frame as usize * channels;

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, self.spec)
                .map_err(|e| PipelineError::Internal(format!("WAV chunk write failed: {}", e)))?;
            match &self.samples {
                Samples::Int(v) => {
                    for sample in &v[lo..hi] {
                        writer.write_sample(*sample).map_err(|e| {
                            PipelineError::Internal(format!("WAV chunk write failed: {}", e))
                        })?;
                    }
                }
                Samples::Float(v) => {
                    for sample in &v[lo..hi] {
                        writer.write_sample(*sample).map_err(|e| {
                            PipelineError::Internal(format!("WAV chunk write failed: {}", e))
                        })?;
                    }
                }
            }
            writer
                .finalize()
                .map_err(|e| PipelineError::Internal(format!("WAV chunk write failed: {}", e)))?;
        }
        Ok(cursor.into_inner())
    }
}

impl AudioSource for WavAudio {
    fn byte_len(&self) -> u64 {
        self.byte_len
    }

    fn duration_ms(&self) -> u64 {
        self.frames() * 1000 / self.spec.sample_rate as u64
    }

    fn read_all(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn read_range(&self, start_ms: u64, end_ms: u64) -> Result<Vec<u8>> {
        if end_ms <= start_ms {
            return Err(PipelineError::Internal(format!(
                "empty audio range requested: {}..{} ms",
                start_ms, end_ms
            )));
        }
        let start_frame = self.frame_at_ms(start_ms);
        let end_frame = self.frame_at_ms(end_ms);
        self.write_frames(start_frame, end_frame)
    }
}
