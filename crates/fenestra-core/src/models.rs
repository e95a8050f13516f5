//! Domain models for ingested images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of an image within the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "image_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    /// Main (hero) image of a project
    Main,
    /// Detail shot belonging to a project
    Detail,
    /// Standalone library image, not tied to a project
    Library,
}

impl ImageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::Main => "main",
            ImageRole::Detail => "detail",
            ImageRole::Library => "library",
        }
    }
}

/// Who an uploaded image belongs to. Determines the object key layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// Image attached to an installation project
    Project(Uuid),
    /// Standalone library image
    Library,
}

impl Owner {
    pub fn project_id(&self) -> Option<Uuid> {
        match self {
            Owner::Project(id) => Some(*id),
            Owner::Library => None,
        }
    }

    /// Object key for a stored file. `variant` is `None` for the original.
    ///
    /// Project images: `projects/{id}/{filename}` and `projects/{id}/{variant}/{filename}`.
    /// Library images: `uploads/original/{filename}` and `uploads/{variant}/{filename}`.
    pub fn object_key(&self, variant: Option<&str>, filename: &str) -> String {
        match (self, variant) {
            (Owner::Project(id), None) => format!("projects/{}/{}", id, filename),
            (Owner::Project(id), Some(v)) => format!("projects/{}/{}/{}", id, v, filename),
            (Owner::Library, None) => format!("uploads/original/{}", filename),
            (Owner::Library, Some(v)) => format!("uploads/{}/{}", v, filename),
        }
    }
}

/// Public URLs of an image and its generated variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantUrls {
    pub original: String,
    pub large: String,
    pub medium: String,
    pub thumb: String,
}

/// A persisted image record. One row per ingested image; all four URLs are
/// written in a single insert and never partially updated.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub role: ImageRole,
    /// Generated storage filename (timestamp + random suffix + sanitized base)
    pub filename: String,
    /// Filename as supplied by the client
    pub original_filename: String,
    pub content_type: String,
    pub original_url: String,
    pub large_url: String,
    pub medium_url: String,
    pub thumb_url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn urls(&self) -> VariantUrls {
        VariantUrls {
            original: self.original_url.clone(),
            large: self.large_url.clone(),
            medium: self.medium_url.clone(),
            thumb: self.thumb_url.clone(),
        }
    }
}

/// Payload for inserting a new image record
#[derive(Debug, Clone)]
pub struct NewImageRecord {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub role: ImageRole,
    pub filename: String,
    pub original_filename: String,
    pub content_type: String,
    pub original_url: String,
    pub large_url: String,
    pub medium_url: String,
    pub thumb_url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size_bytes: i64,
}
