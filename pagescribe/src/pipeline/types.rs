use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ErrorDetail, ErrorKind};
use crate::ocr::LanguageHint;

/// One file part from an upload request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub language: LanguageHint,
    pub summarize: bool,
    pub store_originals: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            language: LanguageHint::default(),
            summarize: true,
            store_originals: false,
        }
    }
}

/// Result for a single uploaded image, serialized as one entry of the
/// `/api/ocr` response array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ImageOutcome {
    Success {
        filename: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stored_url: Option<String>,
        /// Non-fatal problems in optional steps (summary, storage).
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<ErrorDetail>,
    },
    Failure {
        filename: String,
        error: ErrorDetail,
    },
}

impl ImageOutcome {
    pub fn failure(filename: impl Into<String>, error: ErrorDetail) -> Self {
        Self::Failure {
            filename: filename.into(),
            error,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::Success { filename, .. } | Self::Failure { filename, .. } => filename,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success { text, .. } => Some(text),
            Self::Failure { .. } => None,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::Success { summary, .. } => summary.as_deref(),
            Self::Failure { .. } => None,
        }
    }

    pub fn warnings(&self) -> &[ErrorDetail] {
        match self {
            Self::Success { warnings, .. } => warnings,
            Self::Failure { .. } => &[],
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error.kind),
        }
    }
}
