use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SummaryConfig;
use crate::error::SummaryError;

use super::{OpenAiSummarizer, Summarizer};

#[derive(Clone)]
enum SummaryBackend {
    OpenAi(OpenAiSummarizer),
    Unavailable { reason: String },
}

/// Summarizer selected at startup. Without an API key every call fails with
/// `SummaryError::Unavailable`, which the pipeline records as a warning.
#[derive(Clone)]
pub struct SummaryProvider {
    backend: SummaryBackend,
}

impl SummaryProvider {
    pub fn new(config: &SummaryConfig) -> Self {
        let backend = match OpenAiSummarizer::new(config) {
            Ok(client) => {
                info!(model = %config.model, "Summarizer initialized");
                SummaryBackend::OpenAi(client)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Summarizer disabled: {}", reason);
                SummaryBackend::Unavailable { reason }
            }
        };

        Self { backend }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: SummaryBackend::Unavailable {
                reason: reason.to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, SummaryBackend::Unavailable { .. })
    }
}

#[async_trait]
impl Summarizer for SummaryProvider {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        match &self.backend {
            SummaryBackend::OpenAi(client) => client.summarize(text).await,
            SummaryBackend::Unavailable { reason } => {
                Err(SummaryError::Unavailable(reason.clone()))
            }
        }
    }
}
