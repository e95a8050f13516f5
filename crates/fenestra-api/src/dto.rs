//! Request and response DTOs for the image endpoints.

use fenestra_core::models::{ImageRecord, VariantUrls};
use fenestra_core::ErrorMetadata;
use serde::{Deserialize, Serialize};

use crate::services::ingest::IngestOutcome;

/// One per-file outcome in an upload response
#[derive(Debug, Serialize)]
pub struct IngestItem {
    /// Client-supplied filename
    pub file: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<VariantUrls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Upload response: per-file outcomes, `count` is the number of successes
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub count: usize,
    pub items: Vec<IngestItem>,
}

impl IngestResponse {
    pub fn from_outcomes(outcomes: Vec<IngestOutcome>) -> Self {
        let items: Vec<IngestItem> = outcomes
            .into_iter()
            .map(|outcome| match outcome.result {
                Ok(record) => IngestItem {
                    file: outcome.original_filename,
                    ok: true,
                    urls: Some(record.urls()),
                    image: Some(record),
                    error: None,
                    code: None,
                },
                Err(err) => IngestItem {
                    file: outcome.original_filename,
                    ok: false,
                    image: None,
                    urls: None,
                    error: Some(err.client_message()),
                    code: Some(err.error_code().to_string()),
                },
            })
            .collect();

        let count = items.iter().filter(|item| item.ok).count();
        IngestResponse {
            ok: count == items.len(),
            count,
            items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectImagesResponse {
    pub images: Vec<ImageRecord>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LibraryImagesResponse {
    pub images: Vec<ImageRecord>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct DeleteImageResponse {
    pub ok: bool,
    /// False when the record was already gone; the call is idempotent
    pub deleted: bool,
}
