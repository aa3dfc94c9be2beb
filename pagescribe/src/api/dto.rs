use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Multipart body of `POST /api/ocr` (documentation only).
#[derive(Debug, ToSchema)]
pub struct OcrUploadForm {
    /// One or more page images. Parts named `file`, `files`, `files[]`, or
    /// any part carrying a filename are treated as images.
    #[schema(value_type = Vec<String>, format = Binary)]
    pub files: Vec<Vec<u8>>,
    /// `en`, `ko`, `ko+en`, `both` or Tesseract codes such as `kor+eng`.
    pub language: Option<String>,
    /// Summarize non-empty text. Defaults to `SUMMARIZE_DEFAULT`.
    pub summarize: Option<bool>,
    /// Keep the original uploads in temporary storage.
    pub store: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct GeneratePdfRequest {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
    #[validate(length(max = 300))]
    pub title: Option<String>,
    pub summary: Option<String>,
    /// Name used in the stored object key; `.pdf` is appended when missing.
    #[validate(length(min = 1, max = 200))]
    pub filename: Option<String>,
    /// Base64-encoded page image drawn above the text on the first page.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratePdfResponse {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}
