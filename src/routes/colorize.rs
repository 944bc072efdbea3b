use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::colorize::{ColorizeRequest, ColorizeResponse, JobStatusResponse};
use crate::models::job::JobStatus;
use crate::routes::validate_upload;

/// GET / and GET /colorize — the upload UI (embedded at compile time).
pub async fn colorize_page() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// POST /api/colorize — accept an infrared image plus a comma-separated
/// list of reference image ids, and start a colorization job.
pub async fn start_colorization(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ColorizeResponse>)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut reference_ids_raw = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read upload: {e}")))?;
                file = Some((content_type, data.to_vec()));
            }
            Some("reference_ids") => {
                reference_ids_raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read form field: {e}")))?;
            }
            _ => {}
        }
    }

    let (content_type, content) =
        file.ok_or_else(|| ApiError::Validation("Missing image file".to_string()))?;
    validate_upload(&content_type, &content)?;

    let request = ColorizeRequest {
        reference_ids: parse_reference_ids(&reference_ids_raw)?,
    };
    request.validate().map_err(|_| {
        ApiError::Validation("At least one reference image must be selected".to_string())
    })?;

    for reference_id in &request.reference_ids {
        if state.store.get_reference(*reference_id).await.is_none() {
            return Err(ApiError::Validation(format!(
                "Reference image not found: {reference_id}"
            )));
        }
    }

    let upload = state.store.save_upload(&content_type, &content).await?;
    let job_id = state.tracker.submit(upload, request.reference_ids).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(ColorizeResponse {
            job_id,
            status: JobStatus::Pending,
            message: "Colorization started".to_string(),
        }),
    ))
}

fn parse_reference_ids(raw: &str) -> ApiResult<Vec<Uuid>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| ApiError::Validation(format!("Invalid reference id: {s}")))
        })
        .collect()
}

/// GET /api/colorize/{job_id} — job status snapshot for client polling.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state
        .tracker
        .get(job_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        status: job.status,
        result_url: job.result_url.clone(),
        error_message: job.error_message.clone(),
    }))
}

/// GET /api/colorize/{job_id}/result — the colorized image bytes.
/// 404 until the job has completed.
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let job = state
        .tracker
        .get(job_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    let result_url = match (&job.status, &job.result_url) {
        (JobStatus::Completed, Some(url)) => url.clone(),
        _ => return Err(ApiError::NotFound("Result not available".to_string())),
    };

    let path = state.store.result_path(&result_url);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("Result file not found".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"colorized_{job_id}.png\""),
            ),
        ],
        bytes,
    ))
}
