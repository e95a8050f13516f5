//! Standalone library image endpoints.

use crate::dto::{IngestResponse, LibraryImagesResponse, LibraryListQuery};
use crate::error::HttpAppError;
use crate::handlers::multipart::collect_file_parts;
use crate::services::ingest::UploadPart;
use crate::state::AppState;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fenestra_core::models::{ImageRole, Owner};
use fenestra_core::AppError;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// POST /api/uploads
///
/// Field `files` (1 to the batch limit). Responds 201 when every file
/// succeeded, otherwise 200 with per-item outcomes.
pub async fn upload_library_images(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let max_batch = state.config.max_batch_files;
    let file_parts = collect_file_parts(&mut multipart, max_batch).await?;

    let mut parts = Vec::with_capacity(file_parts.len());
    for part in file_parts {
        if part.field != "files" {
            return Err(AppError::InvalidInput(format!(
                "Unexpected multipart field: {}",
                part.field
            ))
            .into());
        }
        parts.push(UploadPart {
            role: ImageRole::Library,
            original_filename: part.original_filename,
            content_type: part.content_type,
            data: part.data,
        });
    }

    if parts.is_empty() {
        return Err(AppError::InvalidInput("No files in request".to_string()).into());
    }

    let outcomes = state.ingest.ingest_batch(Owner::Library, parts).await;

    let response = IngestResponse::from_outcomes(outcomes);
    let status = if response.ok {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

/// GET /api/uploads?page=&limit=
pub async fn list_library_images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LibraryListQuery>,
) -> Result<Json<LibraryImagesResponse>, HttpAppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = i64::from(page - 1) * i64::from(limit);

    let (images, total) = state.images.list_library(i64::from(limit), offset).await?;

    Ok(Json(LibraryImagesResponse {
        images,
        total,
        page,
        limit,
    }))
}
