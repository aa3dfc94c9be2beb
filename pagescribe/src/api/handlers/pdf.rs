use axum::extract::State;
use axum::Json;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::info;
use validator::Validate;

use crate::api::dto::{GeneratePdfRequest, GeneratePdfResponse};
use crate::api::extractors::AppJson;
use crate::api::state::AppState;
use crate::error::{ErrorResponse, PagescribeError, Result};
use crate::pdf::{render_pdf, PageImage, PdfDocumentSpec};
use crate::storage::ArtifactKind;

const DEFAULT_PDF_NAME: &str = "document.pdf";

fn pdf_filename(requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if name.to_ascii_lowercase().ends_with(".pdf") => name.to_string(),
        Some(name) => format!("{name}.pdf"),
        None => DEFAULT_PDF_NAME.to_string(),
    }
}

/// Decode the base64 `image` field, accepting an optional `data:` URL prefix.
fn decode_image_field(encoded: &str, max_bytes: usize) -> Result<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| PagescribeError::Validation(format!("image is not valid base64: {e}")))?;
    if bytes.len() > max_bytes {
        return Err(PagescribeError::PayloadTooLarge(format!(
            "image is {} bytes; the maximum is {max_bytes}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// `POST /api/generate-pdf`
///
/// Render text (with optional title, summary and page image) to a PDF, store
/// it, and return a time-limited download URL.
#[utoipa::path(
    post,
    path = "/api/generate-pdf",
    tag = "pdf",
    request_body = GeneratePdfRequest,
    responses(
        (status = 200, description = "PDF stored", body = GeneratePdfResponse),
        (status = 400, description = "Invalid request or image", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse),
        (status = 502, description = "Storage failed", body = ErrorResponse),
    )
)]
pub async fn generate_pdf(
    State(state): State<AppState>,
    AppJson(req): AppJson<GeneratePdfRequest>,
) -> Result<Json<GeneratePdfResponse>> {
    req.validate()
        .map_err(|e| PagescribeError::Validation(e.to_string()))?;

    let max_chars = state.config.pdf.max_text_chars;
    let text_chars = req.text.chars().count();
    if text_chars > max_chars {
        return Err(PagescribeError::Validation(format!(
            "text is {text_chars} characters; the maximum is {max_chars}"
        )));
    }

    let image_bytes = req
        .image
        .as_deref()
        .filter(|encoded| !encoded.trim().is_empty())
        .map(|encoded| decode_image_field(encoded, state.config.upload.max_file_size))
        .transpose()?;

    let filename = pdf_filename(req.filename.as_deref());
    let font = state.pdf_font.clone();
    let (title, summary, text) = (req.title, req.summary, req.text);

    let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let image = image_bytes
            .as_deref()
            .map(PageImage::decode)
            .transpose()?;
        let document = PdfDocumentSpec {
            title,
            summary,
            text,
            image,
        };
        Ok(render_pdf(&document, font.as_deref())?)
    })
    .await
    .map_err(|e| PagescribeError::Internal(format!("PDF task failed: {e}")))??;

    let size = bytes.len();
    let artifact = state
        .store
        .put(ArtifactKind::Pdf, &filename, bytes, "application/pdf")
        .await?;

    info!(key = %artifact.key, size, "PDF generated");

    Ok(Json(GeneratePdfResponse {
        url: artifact.url,
        expires_at: artifact.expires_at,
    }))
}
