//! Prompt templates for TL;DR generation.
//!
//! The pipeline does not hard-code a locale: callers supply a bundle in
//! whatever language the meetings are held in. Templates use a
//! `{transcript}` placeholder (`{summaries}` for the combine step).

use serde::{Deserialize, Serialize};

/// Prompt bundle for the summariser's map-reduce passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBundle {
    /// System message sent with every request.
    pub system: String,
    /// Used when the whole transcript fits in one request.
    pub final_prompt: String,
    /// Used per chunk of an oversize transcript.
    pub intermediate_prompt: String,
    /// Used to reduce the intermediate summaries into the final TL;DR.
    pub combine_prompt: String,
}

impl Default for PromptBundle {
    fn default() -> Self {
        Self {
            system: "You are an assistant that writes short, accurate summaries of \
                     business meetings."
                .to_string(),
            final_prompt: "Read the following meeting transcript and write a TL;DR of one \
                           or two sentences covering the main topics discussed, listing \
                           the key topics separated by commas. Do not wrap the summary \
                           in quotes.\n\nTranscript:\n{transcript}\n\nTL;DR:"
                .to_string(),
            intermediate_prompt: "Here is part of a meeting transcript. Write a short \
                                  intermediate summary of the main topics discussed:\n\n\
                                  {transcript}\n\nIntermediate summary:"
                .to_string(),
            combine_prompt: "Based on the following intermediate summaries of parts of a \
                             long meeting, write a final TL;DR of one or two sentences \
                             covering the main topics discussed, listing the key topics \
                             separated by commas. Do not wrap the summary in \
                             quotes.\n\nIntermediate summaries:\n{summaries}\n\nFinal TL;DR:"
                .to_string(),
        }
    }
}

impl PromptBundle {
    /// Render the single-shot prompt.
    pub fn render_final(&self, transcript: &str) -> String {
        self.final_prompt.replace("{transcript}", transcript)
    }

    /// Render the per-chunk prompt.
    pub fn render_intermediate(&self, transcript: &str) -> String {
        self.intermediate_prompt.replace("{transcript}", transcript)
    }

    /// Render the reduce prompt over joined intermediate summaries.
    pub fn render_combine(&self, summaries: &str) -> String {
        self.combine_prompt.replace("{summaries}", summaries)
    }
}
