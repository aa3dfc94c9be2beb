use std::convert::Infallible;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers;
use super::openapi;
use super::AppState;

const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

/// `*` (or no configured origin) allows any origin without credentials;
/// explicit origins are allowed with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .max_age(CORS_MAX_AGE);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any).allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(allowed)
        .allow_credentials(true)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.upload.body_limit();
    // 4 bytes per char of UTF-8, a base64 page image (4/3 of its size), plus
    // room for title, summary and JSON framing
    let pdf_limit = state
        .config
        .pdf
        .max_text_chars
        .saturating_mul(4)
        .saturating_add(state.config.upload.max_file_size.saturating_mul(4) / 3)
        .saturating_add(256 * 1024);

    let mut api = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/ocr",
            post(handlers::extract_text).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/generate-pdf",
            post(handlers::generate_pdf)
                .layer::<_, Infallible>(DefaultBodyLimit::max(pdf_limit))
                .layer(RequestBodyLimitLayer::new(pdf_limit)),
        )
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router());

    if state.memory_store.is_some() {
        api = api.route("/artifacts/{*key}", get(handlers::get_artifact));
    }

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(&state.config.server.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_builds_for_wildcard_and_explicit() {
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&[]);
        let _ = cors_layer(&[
            "https://app.example.com".to_string(),
            "not a header\u{7f}".to_string(),
        ]);
    }
}
