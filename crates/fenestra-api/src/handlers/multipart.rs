//! Shared multipart extraction for the upload handlers.

use crate::error::HttpAppError;
use axum::extract::Multipart;
use bytes::Bytes;
use fenestra_core::AppError;

/// A file field pulled out of a multipart request
pub(crate) struct FilePart {
    /// Multipart field name (e.g. "main_image", "detail_images", "files")
    pub field: String,
    pub original_filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Collect every file field from the request. Non-file fields are ignored.
/// Fails once more than `max_files` files have been seen so a runaway request
/// does not buffer unbounded data.
pub(crate) async fn collect_file_parts(
    multipart: &mut Multipart,
    max_files: usize,
) -> Result<Vec<FilePart>, HttpAppError> {
    let mut parts = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart request: {e}")))?
    {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };
        let Some(original_filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field.bytes().await.map_err(|e| {
            AppError::InvalidInput(format!(
                "Failed to read multipart field {field_name}: {e}"
            ))
        })?;

        parts.push(FilePart {
            field: field_name,
            original_filename,
            content_type,
            data,
        });

        if parts.len() > max_files {
            return Err(
                AppError::InvalidInput(format!("Too many files (max {max_files})")).into(),
            );
        }
    }

    Ok(parts)
}
