use axum::extract::multipart::{Field, MultipartError};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart};
use axum::http::StatusCode;

use crate::config::{parse_flag, UploadConfig};
use crate::error::PagescribeError;
use crate::ocr::LanguageHint;
use crate::pipeline::{PipelineOptions, UploadedImage};

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(PagescribeError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for PagescribeError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

fn map_json_rejection(rejection: JsonRejection) -> PagescribeError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                PagescribeError::Validation(format!("Missing required field: {field}"))
            } else {
                PagescribeError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            PagescribeError::Validation(format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => PagescribeError::Validation(
            "Missing `Content-Type: application/json` header".to_string(),
        ),
        JsonRejection::BytesRejection(err) => {
            if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                PagescribeError::PayloadTooLarge("Request body too large".to_string())
            } else {
                PagescribeError::Validation(format!("Failed to read request body: {err}"))
            }
        }
        _ => PagescribeError::Validation(rejection.to_string()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

/// A fully read and validated `/api/ocr` request.
#[derive(Debug)]
pub struct OcrUpload {
    pub images: Vec<UploadedImage>,
    pub options: PipelineOptions,
}

fn is_file_field(name: &str, has_filename: bool) -> bool {
    has_filename || matches!(name, "file" | "files" | "files[]")
}

fn map_multipart_error(error: MultipartError) -> PagescribeError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PagescribeError::PayloadTooLarge(format!("Request body too large: {}", error.body_text()))
    } else {
        PagescribeError::Validation(format!("Malformed multipart body: {}", error.body_text()))
    }
}

async fn read_text_field(field: Field<'_>, name: &str) -> Result<String, PagescribeError> {
    field
        .text()
        .await
        .map(|t| t.trim().to_string())
        .map_err(|e| PagescribeError::Validation(format!("Invalid {name} value: {}", e.body_text())))
}

fn parse_bool_field(raw: &str, name: &str) -> Result<bool, PagescribeError> {
    parse_flag(raw).ok_or_else(|| {
        PagescribeError::Validation(format!(
            "{name} must be one of true/false/1/0/yes/no/on/off"
        ))
    })
}

/// Read file parts chunk by chunk so an oversized file is rejected as soon as
/// it crosses the limit.
async fn read_file_field(
    mut field: Field<'_>,
    filename: &str,
    max_size: usize,
) -> Result<Vec<u8>, PagescribeError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(map_multipart_error)? {
        if bytes.len() + chunk.len() > max_size {
            return Err(PagescribeError::PayloadTooLarge(format!(
                "File '{filename}' exceeds the maximum size of {max_size} bytes"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Parse and validate the whole multipart body before any image is processed.
pub async fn read_ocr_upload(
    mut multipart: Multipart,
    limits: &UploadConfig,
) -> Result<OcrUpload, PagescribeError> {
    let mut images = Vec::new();
    let mut language: Option<LanguageHint> = None;
    let mut summarize = limits.summarize_default;
    let mut store = limits.store_default;

    while let Some(field) = multipart.next_field().await.map_err(map_multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        let has_filename = field.file_name().is_some();

        if is_file_field(&name, has_filename) {
            if images.len() >= limits.max_files {
                return Err(PagescribeError::Validation(format!(
                    "Too many files: at most {} per request",
                    limits.max_files
                )));
            }

            let filename = field
                .file_name()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("file-{}", images.len()));
            let content_type = field.content_type().map(String::from);
            let bytes = read_file_field(field, &filename, limits.max_file_size).await?;

            images.push(UploadedImage {
                filename,
                content_type,
                bytes,
            });
            continue;
        }

        match name.as_str() {
            "language" | "lang" => {
                let raw = read_text_field(field, "language").await?;
                if !raw.is_empty() {
                    language = Some(raw.parse().map_err(|e: String| {
                        PagescribeError::Validation(format!("Invalid language: {e}"))
                    })?);
                }
            }
            "summarize" => {
                let raw = read_text_field(field, "summarize").await?;
                summarize = parse_bool_field(&raw, "summarize")?;
            }
            "store" | "store_originals" => {
                let raw = read_text_field(field, "store").await?;
                store = parse_bool_field(&raw, "store")?;
            }
            _ => {}
        }
    }

    if images.is_empty() {
        return Err(PagescribeError::Validation("No files attached".to_string()));
    }

    Ok(OcrUpload {
        images,
        options: PipelineOptions {
            language: language.unwrap_or_default(),
            summarize,
            store_originals: store,
        },
    })
}
