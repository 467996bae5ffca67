//! TL;DR generation from a diarized transcript.
//!
//! The transcript is rendered as `speaker: text` lines and sent to a chat
//! completion provider. Transcripts too long for the provider's context are
//! map-reduced: each chunk gets an intermediate summary, and the intermediate
//! summaries are combined into the final TL;DR.
//!
//! Summarisation failures never fail the pipeline; they degrade to `None`.

pub mod openai;
pub mod prompts;
pub mod provider;

pub use openai::{OpenAiConfig, OpenAiProvider};
pub use prompts::PromptBundle;
pub use provider::{LlmProvider, Message, ProviderError, ProviderResponse};

use crate::config::PipelineConfig;
use crate::diarize::DiarizedUtterance;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fraction of the provider context reserved for the transcript itself; the
/// rest is headroom for the prompt and the completion.
const CONTEXT_FILL_RATIO: f64 = 0.7;

/// High-level summariser over a pluggable provider.
pub struct Summarizer {
    provider: Box<dyn LlmProvider>,
    prompts: PromptBundle,
}

impl Summarizer {
    /// Create a summariser with the default (English) prompt bundle.
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self {
            provider,
            prompts: PromptBundle::default(),
        }
    }

    /// Replace the prompt bundle (e.g. for a different meeting language).
    pub fn with_prompts(mut self, prompts: PromptBundle) -> Self {
        self.prompts = prompts;
        self
    }

    /// Produce a TL;DR for the given utterances, or `None` when there is
    /// nothing to summarise or the provider fails.
    pub async fn tldr(
        &self,
        utterances: &[DiarizedUtterance],
        config: &PipelineConfig,
        cancel: &CancellationToken,
    ) -> Option<String> {
        let formatted = format_transcript(utterances);
        if formatted.is_empty() {
            debug!("Nothing to summarise; skipping TL;DR");
            return None;
        }

        let budget = chunk_budget_chars(config);
        match self.generate(&formatted, budget, cancel).await {
            Ok(text) => {
                let cleaned = strip_wrapping_quotes(text.trim()).trim().to_string();
                if cleaned.is_empty() {
                    None
                } else {
                    Some(cleaned)
                }
            }
            Err(err) => {
                warn!("TL;DR generation failed: {}", err);
                None
            }
        }
    }

    async fn generate(
        &self,
        formatted: &str,
        budget_chars: usize,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        if formatted.chars().count() <= budget_chars {
            return self.chat(self.prompts.render_final(formatted), cancel).await;
        }

        let chunks = split_into_chunks(formatted, budget_chars);
        info!(
            "Transcript exceeds summariser budget; map-reducing {} chunks",
            chunks.len()
        );

        let mut partials = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            partials.push(
                self.chat(self.prompts.render_intermediate(chunk), cancel)
                    .await?,
            );
        }

        let combined = partials.join("\n\n");
        self.chat(self.prompts.render_combine(&combined), cancel)
            .await
    }

    async fn chat(
        &self,
        user_prompt: String,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let messages = vec![
            Message::system(self.prompts.system.clone()),
            Message::user(user_prompt),
        ];
        tokio::select! {
            result = self.provider.chat(&messages) => result.map(|r| r.content),
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        }
    }
}

/// Render utterances as `speaker: text` lines, one per utterance.
pub fn format_transcript(utterances: &[DiarizedUtterance]) -> String {
    utterances
        .iter()
        .filter(|u| !u.text.trim().is_empty())
        .map(|u| format!("{}: {}", u.speaker, u.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Characters of transcript that fit one request.
fn chunk_budget_chars(config: &PipelineConfig) -> usize {
    (CONTEXT_FILL_RATIO * config.summariser_token_budget as f64 / config.tokens_per_character)
        as usize
}

/// Split at line boundaries into chunks of at most `budget_chars` characters
/// (a single oversize line still becomes its own chunk).
fn split_into_chunks(text: &str, budget_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > budget_chars && !current.is_empty() {
            chunks.push(current.join("\n"));
            current = vec![line];
            current_len = line_len;
        } else {
            current.push(line);
            current_len += line_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }
    chunks
}

/// Strip one pair of surrounding straight double quotes.
fn strip_wrapping_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}
