use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

use crate::api::dto::OcrUploadForm;
use crate::api::extractors::read_ocr_upload;
use crate::api::state::AppState;
use crate::error::{ErrorResponse, PagescribeError, Result};
use crate::pipeline::ImageOutcome;

/// `POST /api/ocr`
///
/// Extract text from one or more page images. Each file gets its own entry in
/// the response, in upload order; a bad file fails only its own entry.
#[utoipa::path(
    post,
    path = "/api/ocr",
    tag = "ocr",
    request_body(content = OcrUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "One result per uploaded file", body = Vec<ImageOutcome>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 413, description = "File or body too large", body = ErrorResponse),
    )
)]
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<ImageOutcome>>> {
    let multipart = multipart.map_err(|e| {
        PagescribeError::Validation(format!("Expected a multipart/form-data body: {e}"))
    })?;

    let upload = read_ocr_upload(multipart, &state.config.upload).await?;

    info!(
        files = upload.images.len(),
        language = %upload.options.language,
        summarize = upload.options.summarize,
        store = upload.options.store_originals,
        "OCR request accepted"
    );

    let outcomes = state.pipeline.process(upload.images, &upload.options).await;
    Ok(Json(outcomes))
}
