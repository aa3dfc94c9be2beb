//! Page summaries through an OpenAI-compatible chat completion API.

mod api;
pub mod prompts;
mod provider;

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::SummaryError;

pub use api::OpenAiSummarizer;
pub use provider::SummaryProvider;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Never called with empty text; callers skip summarization instead.
    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}

/// Keep the leading part of `text` holding at most `max_chars` characters,
/// cut on a grapheme cluster boundary.
///
/// Returns the (possibly shortened) slice and whether anything was dropped.
pub fn truncate_input(text: &str, max_chars: usize) -> (&str, bool) {
    if text.chars().count() <= max_chars {
        return (text, false);
    }

    let mut chars = 0;
    let mut end = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        let width = grapheme.chars().count();
        if chars + width > max_chars {
            break;
        }
        chars += width;
        end = idx + grapheme.len();
    }

    (&text[..end], true)
}
