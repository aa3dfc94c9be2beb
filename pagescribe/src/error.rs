use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error classification shared by request-level errors and
/// per-image failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum ErrorKind {
    InvalidImageError,
    OcrError,
    SummaryError,
    StorageError,
    ValidationError,
    PdfError,
    NotFoundError,
    InternalError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidImageError => "InvalidImageError",
            Self::OcrError => "OcrError",
            Self::SummaryError => "SummaryError",
            Self::StorageError => "StorageError",
            Self::ValidationError => "ValidationError",
            Self::PdfError => "PdfError",
            Self::NotFoundError => "NotFoundError",
            Self::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

/// `{ "kind": "...", "message": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("empty file")]
    Empty,

    #[error("unsupported or unrecognized image format")]
    UnsupportedFormat,

    #[error("declared content type '{0}' is not an image")]
    NotAnImage(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("image too small: {width}x{height}, minimum {min}x{min}")]
    TooSmall { width: u32, height: u32, min: u32 },

    #[error("failed to encode image: {0}")]
    Encode(String),
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR backend unavailable: {0}")]
    Unavailable(String),

    #[error("OCR timed out after {0} seconds")]
    Timeout(u64),

    #[error("OCR engine failure: {0}")]
    Engine(String),

    #[error("OCR request failed: {0}")]
    Request(String),

    #[error("OCR backend returned a malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("summarizer timed out after {0} seconds")]
    Timeout(u64),

    #[error("summarizer rate limit exceeded")]
    RateLimited,

    #[error("summarizer authentication failed: {0}")]
    Auth(String),

    #[error("summarizer request failed: {0}")]
    Request(String),

    #[error("summarizer returned a malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage disabled")]
    Disabled,

    #[error("storage operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("failed to upload object {key}: {message}")]
    Upload { key: String, message: String },

    #[error("failed to presign object {key}: {message}")]
    Presign { key: String, message: String },

    #[error("bucket configuration failed: {0}")]
    BucketConfig(String),
}

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("failed to build PDF content: {0}")]
    Content(String),

    #[error("failed to serialize PDF: {0}")]
    Serialize(String),

    #[error("unusable font: {0}")]
    Font(String),
}

#[derive(Error, Debug)]
pub enum PagescribeError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl PagescribeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidImage(_) => ErrorKind::InvalidImageError,
            Self::Ocr(_) => ErrorKind::OcrError,
            Self::Summary(_) => ErrorKind::SummaryError,
            Self::Storage(_) => ErrorKind::StorageError,
            Self::Pdf(_) => ErrorKind::PdfError,
            Self::Validation(_) | Self::PayloadTooLarge(_) => ErrorKind::ValidationError,
            Self::NotFound(_) => ErrorKind::NotFoundError,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidImage(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Ocr(_) | Self::Summary(_) | Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::Pdf(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The payload used for per-image failure records and error responses.
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail::new(self.kind(), self.to_string())
    }
}

/// Error response body: `{ "error": { "kind": "...", "message": "..." } }`
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

impl IntoResponse for PagescribeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ErrorDetail::new(ErrorKind::InternalError, "An internal error occurred")
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, kind = %other.kind(), "Request failed");
                } else {
                    tracing::debug!(error = %other, kind = %other.kind(), "Request rejected");
                }
                other.detail()
            }
        };

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PagescribeError>;
