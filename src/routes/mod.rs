use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::error::ApiError;

pub mod colorize;
pub mod health;
pub mod metrics;
pub mod references;

pub const ALLOWED_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Headroom over the upload cap for multipart framing; the exact 10 MB
/// limit is enforced per file in the handlers.
const BODY_LIMIT_BYTES: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

/// Build the application router with all API routes, the static data
/// directory, and the middleware stack. The Prometheus scrape route is
/// attached separately in `main` since it carries its own state.
pub fn router(state: AppState) -> Router {
    let serve_data = ServeDir::new(&state.config.data_dir);

    Router::new()
        .route("/", get(colorize::colorize_page))
        .route("/colorize", get(colorize::colorize_page))
        .route("/health", get(health::health_check))
        .route(
            "/api/colorize",
            axum::routing::post(colorize::start_colorization),
        )
        .route("/api/colorize/{job_id}", get(colorize::get_job_status))
        .route(
            "/api/colorize/{job_id}/result",
            get(colorize::get_job_result),
        )
        .route(
            "/api/references",
            get(references::list_references).post(references::upload_reference),
        )
        .route(
            "/api/references/{reference_id}",
            get(references::get_reference).delete(references::delete_reference),
        )
        .nest_service("/data", serve_data)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
}

/// Validate an uploaded image's declared content type, size, and magic
/// bytes before any storage side effect.
pub(crate) fn validate_upload(content_type: &str, content: &[u8]) -> Result<(), ApiError> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(ApiError::Validation(format!(
            "Invalid file type. Allowed: {}",
            ALLOWED_CONTENT_TYPES.join(", ")
        )));
    }

    if content.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::Validation(format!(
            "File too large. Maximum size: {}MB",
            MAX_UPLOAD_BYTES / 1024 / 1024
        )));
    }

    image::guess_format(content)
        .map_err(|_| ApiError::Validation("File does not look like an image".to_string()))?;

    Ok(())
}
