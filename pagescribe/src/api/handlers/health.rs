use axum::Json;

use crate::api::dto::HealthResponse;

/// `GET /api/health`
///
/// Liveness only; no backend is contacted.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
