//! Object storage backends for ingested images.
//!
//! The `Storage` trait abstracts over the S3-compatible production backend
//! (Cloudflare R2) and a local-filesystem backend used in development. Keys
//! follow the site layout: `projects/{project_id}/[{variant}/]{filename}` for
//! project images and `uploads/{original|large|medium|thumb}/{filename}` for
//! standalone library images.

pub mod factory;
pub mod keys;
pub mod local;
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, Uploaded};
