use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::reference::{ReferenceImage, ReferenceImageList};
use crate::routes::validate_upload;

/// GET /api/references — all reference images, oldest first.
pub async fn list_references(State(state): State<AppState>) -> Json<ReferenceImageList> {
    Json(ReferenceImageList {
        references: state.store.list_references().await,
    })
}

/// POST /api/references — upload a new reference color image.
pub async fn upload_reference(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ReferenceImage>)> {
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("image.jpg").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read upload: {e}")))?;
            file = Some((filename, content_type, data.to_vec()));
        }
    }

    let (filename, content_type, content) =
        file.ok_or_else(|| ApiError::Validation("Missing image file".to_string()))?;
    validate_upload(&content_type, &content)?;

    let reference = state
        .store
        .save_reference(&filename, &content_type, &content)
        .await?;

    Ok((StatusCode::CREATED, Json(reference)))
}

/// GET /api/references/{reference_id}
pub async fn get_reference(
    State(state): State<AppState>,
    Path(reference_id): Path<Uuid>,
) -> ApiResult<Json<ReferenceImage>> {
    state
        .store
        .get_reference(reference_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Reference image not found".to_string()))
}

/// DELETE /api/references/{reference_id} — 204 on success, 404 if the id
/// is unknown.
pub async fn delete_reference(
    State(state): State<AppState>,
    Path(reference_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_reference(reference_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
