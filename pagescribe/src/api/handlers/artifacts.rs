use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::api::state::AppState;
use crate::error::{ErrorResponse, PagescribeError, Result};

/// `GET /api/artifacts/{*key}`
///
/// Serves artifacts held by the in-memory store. Only mounted when
/// `STORAGE_BACKEND=memory`.
#[utoipa::path(
    get,
    path = "/api/artifacts/{key}",
    tag = "artifacts",
    params(("key" = String, Path, description = "Artifact key")),
    responses(
        (status = 200, description = "Artifact bytes"),
        (status = 404, description = "Unknown or expired artifact", body = ErrorResponse),
    )
)]
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let store = state
        .memory_store
        .as_ref()
        .ok_or_else(|| PagescribeError::NotFound("Artifact serving is disabled".to_string()))?;

    let blob = store
        .get_at(&key, Utc::now())
        .await
        .ok_or_else(|| PagescribeError::NotFound(format!("Artifact {key} not found or expired")))?;

    Ok(([(header::CONTENT_TYPE, blob.content_type)], blob.bytes).into_response())
}
