//! Core error types for the transcript pipeline.
//!
//! Every component reports failures through [`PipelineError`]; the summariser
//! keeps its own provider error because its failures never propagate (a failed
//! TL;DR leaves the rest of the result intact).

use thiserror::Error;

/// Errors surfaced by the transcript pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed caller input: missing audio, non-monotone activity events,
    /// a word-level transcript without a recording start, and similar.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The STT or summariser provider could not be reached or returned a
    /// server-side failure.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider answered but the response is missing required fields.
    #[error("Provider contract violation: {0}")]
    ProviderContract(String),

    /// Caller-initiated cancellation or deadline exceeded.
    #[error("Operation cancelled")]
    Cancelled,

    /// An internal invariant was violated during assembly. Always logged.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipelineError::Cancelled
        } else if err.is_decode() {
            PipelineError::ProviderContract(err.to_string())
        } else {
            PipelineError::ProviderUnavailable(err.to_string())
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
