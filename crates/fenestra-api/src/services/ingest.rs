//! Ingestion orchestrator.
//!
//! Drives the per-file pipeline: validate, spool to a per-file temp
//! directory, generate variants, upload original + variants concurrently,
//! insert the database record. The spool directory is removed on success and
//! failure alike. Files in a batch are independent; one failure never aborts
//! the others.

use bytes::Bytes;
use fenestra_core::models::{ImageRole, NewImageRecord, Owner};
use fenestra_core::AppError;
use fenestra_db::ImageRepository;
use fenestra_processing::{
    filename, generate_variants, metadata, UploadValidator, VariantKind, VariantSpec,
};
use fenestra_storage::{Storage, Uploaded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// One file of an upload request
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub role: ImageRole,
    pub original_filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Per-file result of a batch ingestion
#[derive(Debug)]
pub struct IngestOutcome {
    pub original_filename: String,
    pub result: Result<fenestra_core::models::ImageRecord, AppError>,
}

/// The ingestion pipeline service
#[derive(Clone)]
pub struct IngestService {
    storage: Arc<dyn Storage>,
    images: Arc<dyn ImageRepository>,
    validator: UploadValidator,
    specs: [VariantSpec; 3],
    spool_root: PathBuf,
}

impl IngestService {
    pub fn new(
        storage: Arc<dyn Storage>,
        images: Arc<dyn ImageRepository>,
        validator: UploadValidator,
        specs: [VariantSpec; 3],
        spool_root: PathBuf,
    ) -> Self {
        Self {
            storage,
            images,
            validator,
            specs,
            spool_root,
        }
    }

    /// Ingest a batch of files for one owner. Every file is processed even
    /// when earlier ones fail; the caller reports outcomes per item.
    pub async fn ingest_batch(&self, owner: Owner, parts: Vec<UploadPart>) -> Vec<IngestOutcome> {
        let mut outcomes = Vec::with_capacity(parts.len());

        for part in parts {
            let result = self.ingest_one(owner, &part).await;
            if let Err(ref err) = result {
                tracing::warn!(
                    error = %err,
                    file = %part.original_filename,
                    "File ingestion failed"
                );
            }
            outcomes.push(IngestOutcome {
                original_filename: part.original_filename,
                result,
            });
        }

        outcomes
    }

    /// Run the full pipeline for one file.
    async fn ingest_one(
        &self,
        owner: Owner,
        part: &UploadPart,
    ) -> Result<fenestra_core::models::ImageRecord, AppError> {
        // Validation happens before anything touches disk.
        self.validator
            .validate(&part.content_type, part.data.len())?;

        let storage_filename = filename::build_upload_filename(&part.original_filename);

        let spool = tempfile::tempdir_in(&self.spool_root)
            .map_err(|e| AppError::Internal(format!("Failed to create spool directory: {e}")))?;

        let result = self
            .process_spooled(owner, part, &storage_filename, spool.path())
            .await;

        // Temp files are removed on success and failure alike; cleanup
        // trouble is logged, never escalated.
        if let Err(e) = spool.close() {
            tracing::warn!(error = %e, "Failed to remove spool directory");
        }

        result
    }

    async fn process_spooled(
        &self,
        owner: Owner,
        part: &UploadPart,
        storage_filename: &str,
        spool: &Path,
    ) -> Result<fenestra_core::models::ImageRecord, AppError> {
        let original_dir = spool.join("original");
        tokio::fs::create_dir_all(&original_dir).await?;
        let original_path = original_dir.join(storage_filename);
        tokio::fs::write(&original_path, &part.data).await?;

        // CPU-heavy decode/resize/encode runs off the async threads.
        let variants = {
            let source = original_path.clone();
            let fname = storage_filename.to_string();
            let content_type = part.content_type.clone();
            let out_root = spool.to_path_buf();
            let specs = self.specs;
            tokio::task::spawn_blocking(move || {
                generate_variants(&source, &fname, &content_type, &out_root, &specs)
            })
            .await
            .map_err(|e| AppError::Internal(format!("Variant generation task failed: {e}")))?
            .map_err(|e| AppError::ImageProcessing(e.to_string()))?
        };

        let variant_path = |kind: VariantKind| -> Result<PathBuf, AppError> {
            variants
                .iter()
                .find(|v| v.kind == kind)
                .map(|v| v.path.clone())
                .ok_or_else(|| {
                    AppError::ImageProcessing(format!("Missing {} variant", kind.as_str()))
                })
        };
        let large_path = variant_path(VariantKind::Large)?;
        let medium_path = variant_path(VariantKind::Medium)?;
        let thumb_path = variant_path(VariantKind::Thumb)?;

        let original_key = owner.object_key(None, storage_filename);
        let large_key = owner.object_key(Some("large"), storage_filename);
        let medium_key = owner.object_key(Some("medium"), storage_filename);
        let thumb_key = owner.object_key(Some("thumb"), storage_filename);

        // All four puts in flight together.
        let (original, large, medium, thumb) = tokio::try_join!(
            self.upload(&original_path, &original_key, &part.content_type),
            self.upload(&large_path, &large_key, &part.content_type),
            self.upload(&medium_path, &medium_key, &part.content_type),
            self.upload(&thumb_path, &thumb_key, &part.content_type),
        )?;

        let dims = metadata::probe_dimensions(&part.data);

        let record = self
            .images
            .create(NewImageRecord {
                id: Uuid::new_v4(),
                project_id: owner.project_id(),
                role: part.role,
                filename: storage_filename.to_string(),
                original_filename: part.original_filename.clone(),
                content_type: part.content_type.clone(),
                original_url: original.url,
                large_url: large.url,
                medium_url: medium.url,
                thumb_url: thumb.url,
                width: dims.map(|d| d.width as i32),
                height: dims.map(|d| d.height as i32),
                size_bytes: part.data.len() as i64,
            })
            .await?;

        if part.role == ImageRole::Main {
            if let Owner::Project(project_id) = owner {
                self.images
                    .set_project_main_image(project_id, &record.medium_url)
                    .await?;
            }
        }

        tracing::info!(
            image_id = %record.id,
            file = %record.original_filename,
            key = %original.key,
            size_bytes = record.size_bytes,
            "Image ingested"
        );

        Ok(record)
    }

    async fn upload(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<Uploaded, AppError> {
        self.storage
            .upload(path, key, content_type)
            .await
            .map_err(AppError::from)
    }

    /// Delete an image: best-effort removal of the four remote objects, then
    /// the database row. Returns false when the record was already gone.
    pub async fn remove(&self, id: Uuid) -> Result<bool, AppError> {
        let Some(record) = self.images.get(id).await? else {
            return Ok(false);
        };

        for url in [
            &record.original_url,
            &record.large_url,
            &record.medium_url,
            &record.thumb_url,
        ] {
            if let Err(e) = self.storage.delete_by_url(url).await {
                tracing::warn!(
                    error = %e,
                    image_id = %id,
                    url = %url,
                    "Remote delete failed; continuing"
                );
            }
        }

        self.images.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use fenestra_core::models::ImageRecord;
    use fenestra_core::StorageBackend;
    use fenestra_storage::{keys, StorageError, StorageResult};
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    const TEST_BASE_URL: &str = "https://cdn.test";

    #[derive(Default)]
    struct MockStorage {
        uploads: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
        fail_uploads_containing: Option<String>,
        fail_deletes: bool,
    }

    #[async_trait]
    impl Storage for MockStorage {
        async fn upload(
            &self,
            local_path: &Path,
            key: &str,
            _content_type: &str,
        ) -> StorageResult<Uploaded> {
            // The spooled file must exist at upload time
            assert!(
                tokio::fs::try_exists(local_path).await.unwrap(),
                "missing spooled file {}",
                local_path.display()
            );

            let key = keys::clean_key(key).to_string();
            if let Some(ref needle) = self.fail_uploads_containing {
                if key.contains(needle.as_str()) {
                    return Err(StorageError::UploadFailed("injected failure".to_string()));
                }
            }

            self.uploads.lock().unwrap().push(key.clone());
            let url = keys::public_url(TEST_BASE_URL, &key);
            Ok(Uploaded { key, url })
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            if self.fail_deletes {
                return Err(StorageError::DeleteFailed("injected failure".to_string()));
            }
            self.deletes.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            Ok(self.uploads.lock().unwrap().iter().any(|k| k == key))
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }

        fn public_base_url(&self) -> &str {
            TEST_BASE_URL
        }
    }

    #[derive(Default)]
    struct InMemoryRepository {
        rows: Mutex<Vec<ImageRecord>>,
        main_images: Mutex<HashMap<Uuid, String>>,
    }

    #[async_trait]
    impl ImageRepository for InMemoryRepository {
        async fn create(&self, record: NewImageRecord) -> Result<ImageRecord, AppError> {
            let row = ImageRecord {
                id: record.id,
                project_id: record.project_id,
                role: record.role,
                filename: record.filename,
                original_filename: record.original_filename,
                content_type: record.content_type,
                original_url: record.original_url,
                large_url: record.large_url,
                medium_url: record.medium_url,
                thumb_url: record.thumb_url,
                width: record.width,
                height: record.height,
                size_bytes: record.size_bytes,
                created_at: Utc::now(),
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }

        async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ImageRecord>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.project_id == Some(project_id))
                .cloned()
                .collect())
        }

        async fn list_library(
            &self,
            _limit: i64,
            _offset: i64,
        ) -> Result<(Vec<ImageRecord>, i64), AppError> {
            let rows: Vec<ImageRecord> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.project_id.is_none())
                .cloned()
                .collect();
            let total = rows.len() as i64;
            Ok((rows, total))
        }

        async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| r.id != id);
            Ok(rows.len() < before)
        }

        async fn set_project_main_image(
            &self,
            project_id: Uuid,
            url: &str,
        ) -> Result<(), AppError> {
            self.main_images
                .lock()
                .unwrap()
                .insert(project_id, url.to_string());
            Ok(())
        }
    }

    struct Harness {
        service: IngestService,
        storage: Arc<MockStorage>,
        images: Arc<InMemoryRepository>,
        _spool_root: tempfile::TempDir,
    }

    impl Harness {
        fn new(storage: MockStorage) -> Self {
            Self::with_max_file_size(storage, 50 * 1024 * 1024)
        }

        fn with_max_file_size(storage: MockStorage, max_file_size: usize) -> Self {
            let spool_root = tempfile::tempdir().unwrap();
            let storage = Arc::new(storage);
            let images = Arc::new(InMemoryRepository::default());
            let service = IngestService::new(
                storage.clone(),
                images.clone(),
                UploadValidator::new(
                    max_file_size,
                    vec![
                        "image/jpeg".to_string(),
                        "image/png".to_string(),
                        "image/webp".to_string(),
                        "image/gif".to_string(),
                    ],
                ),
                VariantSpec::defaults(),
                spool_root.path().to_path_buf(),
            );
            Harness {
                service,
                storage,
                images,
                _spool_root: spool_root,
            }
        }

        fn spool_entries(&self) -> usize {
            std::fs::read_dir(self._spool_root.path()).unwrap().count()
        }
    }

    fn png_part(name: &str, width: u32, height: u32, role: ImageRole) -> UploadPart {
        let img = RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        UploadPart {
            role,
            original_filename: name.to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from(buffer),
        }
    }

    fn jpeg_part(name: &str, width: u32, height: u32, role: ImageRole) -> UploadPart {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        });
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Jpeg)
            .unwrap();
        UploadPart {
            role,
            original_filename: name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: Bytes::from(buffer),
        }
    }

    #[tokio::test]
    async fn test_library_upload_happy_path() {
        let h = Harness::new(MockStorage::default());
        let part = png_part("Living Room.png", 100, 100, ImageRole::Library);

        let outcomes = h.service.ingest_batch(Owner::Library, vec![part]).await;
        assert_eq!(outcomes.len(), 1);

        let record = outcomes[0].result.as_ref().unwrap();
        assert_eq!(record.width, Some(100));
        assert_eq!(record.height, Some(100));
        assert!(record.filename.ends_with(".png"));
        assert!(record.original_url.starts_with(TEST_BASE_URL));

        // Original plus three variants, under the library key layout
        let uploads = h.storage.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 4);
        assert!(uploads.iter().any(|k| k.starts_with("uploads/original/")));
        for variant in ["large", "medium", "thumb"] {
            assert!(uploads
                .iter()
                .any(|k| k.starts_with(&format!("uploads/{}/", variant))));
        }

        // Spool is empty once ingestion is done
        assert_eq!(h.spool_entries(), 0);
    }

    #[tokio::test]
    async fn test_project_main_upload_sets_main_image() {
        let h = Harness::new(MockStorage::default());
        let project_id = Uuid::new_v4();
        let part = jpeg_part("facade.jpg", 3000, 2000, ImageRole::Main);

        let outcomes = h
            .service
            .ingest_batch(Owner::Project(project_id), vec![part])
            .await;
        let record = outcomes[0].result.as_ref().unwrap();
        assert_eq!(record.project_id, Some(project_id));

        let uploads = h.storage.uploads.lock().unwrap().clone();
        let prefix = format!("projects/{}/", project_id);
        assert!(uploads.iter().all(|k| k.starts_with(&prefix)));

        let main_images = h.images.main_images.lock().unwrap().clone();
        assert_eq!(main_images.get(&project_id), Some(&record.medium_url));
    }

    #[tokio::test]
    async fn test_validation_failure_touches_nothing() {
        let h = Harness::new(MockStorage::default());
        let part = UploadPart {
            role: ImageRole::Library,
            original_filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            data: Bytes::from_static(b"hello"),
        };

        let outcomes = h.service.ingest_batch(Owner::Library, vec![part]).await;
        assert!(matches!(
            outcomes[0].result,
            Err(AppError::InvalidInput(_))
        ));

        assert!(h.storage.uploads.lock().unwrap().is_empty());
        assert!(h.images.rows.lock().unwrap().is_empty());
        assert_eq!(h.spool_entries(), 0);
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected_before_spooling() {
        let h = Harness::with_max_file_size(MockStorage::default(), 1024);
        let part = UploadPart {
            role: ImageRole::Library,
            original_filename: "huge.png".to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from(vec![0u8; 4096]),
        };

        let outcomes = h.service.ingest_batch(Owner::Library, vec![part]).await;
        assert!(matches!(
            outcomes[0].result,
            Err(AppError::PayloadTooLarge(_))
        ));

        // Rejected before anything touched disk or the store
        assert!(h.storage.uploads.lock().unwrap().is_empty());
        assert!(h.images.rows.lock().unwrap().is_empty());
        assert_eq!(h.spool_entries(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_file_is_a_processing_error() {
        let h = Harness::new(MockStorage::default());
        let part = UploadPart {
            role: ImageRole::Library,
            original_filename: "corrupt.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: Bytes::from_static(b"not really a jpeg"),
        };

        let outcomes = h.service.ingest_batch(Owner::Library, vec![part]).await;
        assert!(matches!(
            outcomes[0].result,
            Err(AppError::ImageProcessing(_))
        ));
        assert!(h.storage.uploads.lock().unwrap().is_empty());
        assert_eq!(h.spool_entries(), 0);
    }

    #[tokio::test]
    async fn test_batch_second_file_failure_leaves_others_intact() {
        let h = Harness::new(MockStorage {
            // The generated filename keeps the sanitized stem, so this hits
            // only the second file's keys
            fail_uploads_containing: Some("-broken.png".to_string()),
            ..MockStorage::default()
        });

        let parts = vec![
            png_part("first.png", 50, 50, ImageRole::Library),
            png_part("broken.png", 50, 50, ImageRole::Library),
            png_part("third.png", 50, 50, ImageRole::Library),
        ];

        let outcomes = h.service.ingest_batch(Owner::Library, parts).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(AppError::Storage(_))));
        assert!(outcomes[2].result.is_ok());

        // Only the two successful files got database rows
        assert_eq!(h.images.rows.lock().unwrap().len(), 2);

        // No temp files remain for any of the three
        assert_eq!(h.spool_entries(), 0);
    }

    #[tokio::test]
    async fn test_remove_deletes_remote_objects_and_row() {
        let h = Harness::new(MockStorage::default());
        let part = png_part("door.png", 60, 40, ImageRole::Library);
        let outcomes = h.service.ingest_batch(Owner::Library, vec![part]).await;
        let id = outcomes[0].result.as_ref().unwrap().id;

        assert!(h.service.remove(id).await.unwrap());
        assert_eq!(h.storage.deletes.lock().unwrap().len(), 4);
        assert!(h.images.rows.lock().unwrap().is_empty());

        // Second remove is a no-op
        assert!(!h.service.remove(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_survives_remote_delete_failure() {
        let h = Harness::new(MockStorage {
            fail_deletes: true,
            ..MockStorage::default()
        });
        let part = png_part("window.png", 60, 40, ImageRole::Library);
        let outcomes = h.service.ingest_batch(Owner::Library, vec![part]).await;
        let id = outcomes[0].result.as_ref().unwrap().id;

        // Remote failures are logged, the row is still removed
        assert!(h.service.remove(id).await.unwrap());
        assert!(h.images.rows.lock().unwrap().is_empty());
    }
}
