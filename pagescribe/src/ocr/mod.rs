//! OCR (Optical Character Recognition) Module
//!
//! Turns a normalized page image into plain text. The backend is picked once at
//! startup from `OcrConfig::backend`:
//! - `tesseract`: local engine via leptess, run on a blocking thread
//! - `google-vision`: Google Cloud Vision `images:annotate`
//! - `openai`: OpenAI-compatible vision chat completion
//!
//! A backend that cannot be initialized (missing traineddata, missing API key)
//! is kept as `Unavailable` and every call fails with `OcrError::Unavailable`.
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrProvider::new(&config.ocr);
//! let text = ocr.extract_text(&decoded.png, &LanguageHint::default()).await?;
//! ```

mod api;
mod engine_cache;
mod language;
mod provider;

use async_trait::async_trait;

use crate::error::OcrError;

pub use api::{GoogleVisionClient, OpenAiVisionClient};
pub use language::LanguageHint;
pub use provider::OcrProvider;

/// Image bytes in, text out.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// `png` is the decoder's normalized output. Returns trimmed text with
    /// internal line breaks kept; an empty string means no text was found.
    async fn extract_text(&self, png: &[u8], language: &LanguageHint) -> Result<String, OcrError>;
}
