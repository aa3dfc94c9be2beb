use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use crate::error::{ErrorDetail, ErrorKind, ErrorResponse};
use crate::pipeline::ImageOutcome;

use super::dto;
use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pagescribe API",
        version = "0.1.0",
        description = "OCR for book-page images with optional summaries and PDF export.",
    ),
    paths(
        handlers::health::health_check,
        handlers::ocr::extract_text,
        handlers::pdf::generate_pdf,
        handlers::artifacts::get_artifact,
    ),
    components(schemas(
        ErrorKind,
        ErrorDetail,
        ErrorResponse,
        ImageOutcome,
        dto::HealthResponse,
        dto::OcrUploadForm,
        dto::GeneratePdfRequest,
        dto::GeneratePdfResponse,
    )),
    tags(
        (name = "health", description = "Liveness check"),
        (name = "ocr", description = "Text extraction from page images"),
        (name = "pdf", description = "PDF generation"),
        (name = "artifacts", description = "Temporary artifacts (in-memory storage only)"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
