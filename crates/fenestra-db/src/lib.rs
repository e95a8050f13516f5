//! Database access for image records.
//!
//! The `ImageRepository` trait is what the ingestion orchestrator depends on;
//! `PgImageRepository` is the Postgres implementation. Migrations live in
//! `migrations/` and are embedded via `sqlx::migrate!`.

pub mod images;

pub use images::{ImageRepository, PgImageRepository};

/// Embedded migrations, run at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
