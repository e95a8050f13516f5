//! Project image endpoints: multipart upload and listing.

use crate::dto::{IngestResponse, ProjectImagesResponse};
use crate::error::HttpAppError;
use crate::handlers::multipart::collect_file_parts;
use crate::services::ingest::UploadPart;
use crate::state::AppState;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fenestra_core::models::{ImageRole, Owner};
use fenestra_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// POST /api/projects/{project_id}/images
///
/// Fields: `main_image` (at most one) and `detail_images` (up to the batch
/// limit). Responds 201 when every file succeeded, otherwise 200 with
/// per-item outcomes.
pub async fn upload_project_images(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let max_batch = state.config.max_batch_files;
    let file_parts = collect_file_parts(&mut multipart, max_batch + 1).await?;

    let mut parts = Vec::with_capacity(file_parts.len());
    let mut main_count = 0usize;
    for part in file_parts {
        let role = match part.field.as_str() {
            "main_image" => {
                main_count += 1;
                ImageRole::Main
            }
            "detail_images" => ImageRole::Detail,
            other => {
                return Err(
                    AppError::InvalidInput(format!("Unexpected multipart field: {other}")).into(),
                )
            }
        };
        parts.push(UploadPart {
            role,
            original_filename: part.original_filename,
            content_type: part.content_type,
            data: part.data,
        });
    }

    if parts.is_empty() {
        return Err(AppError::InvalidInput("No files in request".to_string()).into());
    }
    if main_count > 1 {
        return Err(AppError::InvalidInput("At most one main_image is allowed".to_string()).into());
    }
    if parts.len() - main_count > max_batch {
        return Err(
            AppError::InvalidInput(format!("Too many detail_images (max {max_batch})")).into(),
        );
    }

    let outcomes = state
        .ingest
        .ingest_batch(Owner::Project(project_id), parts)
        .await;

    let response = IngestResponse::from_outcomes(outcomes);
    let status = if response.ok {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

/// GET /api/projects/{project_id}/images
pub async fn list_project_images(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectImagesResponse>, HttpAppError> {
    let images = state.images.list_for_project(project_id).await?;
    Ok(Json(ProjectImagesResponse { images }))
}
