//! Prompt templates for page summaries.

/// System prompt used when `SUMMARY_PROMPT` is not set.
///
/// The summary is written in the page's own language so Korean pages get
/// Korean summaries.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You summarize text extracted from a scanned book page. \
Write a brief summary of a few sentences in the same language as the text. \
The text comes from OCR and may contain recognition errors or broken lines; \
ignore page numbers, running headers and obvious noise. \
Respond with the summary only.";

/// Wrap the page text for the user message.
///
/// # Example
/// ```
/// use pagescribe::summarize::prompts::page_summary_message;
///
/// let message = page_summary_message("첫 번째 문단", false);
/// assert!(message.contains("첫 번째 문단"));
/// ```
pub fn page_summary_message(text: &str, truncated: bool) -> String {
    if truncated {
        format!("{text}\n\n[The page text was cut short; summarize the part above.]")
    } else {
        text.to_string()
    }
}
