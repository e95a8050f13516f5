//! Image deletion endpoint.

use crate::dto::DeleteImageResponse;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

/// DELETE /api/images/{id}
///
/// Removes the four remote objects (best effort) and the database row.
/// Deleting an already-deleted image is a success with `deleted: false`.
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteImageResponse>, HttpAppError> {
    let deleted = state.ingest.remove(id).await?;
    Ok(Json(DeleteImageResponse { ok: true, deleted }))
}
