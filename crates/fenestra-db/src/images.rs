//! Image record repository.

use async_trait::async_trait;
use fenestra_core::models::{ImageRecord, NewImageRecord};
use fenestra_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Persistence capability the ingestion orchestrator depends on.
///
/// Injected as a trait object so the pipeline is testable with an in-memory
/// implementation.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert a record with all four URLs in a single statement.
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError>;

    /// All images of a project, newest first.
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ImageRecord>, AppError>;

    /// Paginated standalone library images, newest first. Returns the page
    /// plus the total library count.
    async fn list_library(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ImageRecord>, i64), AppError>;

    /// Delete a record; returns false when no row matched.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Point a project's main image at the given URL.
    async fn set_project_main_image(&self, project_id: Uuid, url: &str) -> Result<(), AppError>;
}

/// Postgres-backed implementation
#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord, AppError> {
        let row = sqlx::query_as::<_, ImageRecord>(
            r#"
            INSERT INTO images (
                id, project_id, role, filename, original_filename, content_type,
                original_url, large_url, medium_url, thumb_url,
                width, height, size_bytes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.project_id)
        .bind(record.role)
        .bind(&record.filename)
        .bind(&record.original_filename)
        .bind(&record.content_type)
        .bind(&record.original_url)
        .bind(&record.large_url)
        .bind(&record.medium_url)
        .bind(&record.thumb_url)
        .bind(record.width)
        .bind(record.height)
        .bind(record.size_bytes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError> {
        let row = sqlx::query_as::<_, ImageRecord>("SELECT * FROM images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ImageRecord>, AppError> {
        let rows = sqlx::query_as::<_, ImageRecord>(
            "SELECT * FROM images WHERE project_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_library(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ImageRecord>, i64), AppError> {
        let rows = sqlx::query_as::<_, ImageRecord>(
            r#"
            SELECT * FROM images
            WHERE project_id IS NULL
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE project_id IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_project_main_image(&self, project_id: Uuid, url: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE projects SET main_image_url = $2 WHERE id = $1")
            .bind(project_id)
            .bind(url)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                project_id = %project_id,
                "Main image uploaded for a project with no row; main_image_url not set"
            );
        }

        Ok(())
    }
}
