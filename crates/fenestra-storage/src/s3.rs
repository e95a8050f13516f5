use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult, Uploaded};
use async_trait::async_trait;
use bytes::Bytes;
use fenestra_core::StorageBackend;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutMultipartOptions, PutOptions,
    PutPayload, WriteMultipart,
};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Part size for multipart uploads of spooled files.
const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;
/// Read granularity when feeding the multipart writer.
const READ_BUF_SIZE: usize = 64 * 1024;
/// At most this many parts in flight per upload; bounds memory to
/// (MAX_IN_FLIGHT_PARTS + 1) * UPLOAD_CHUNK_SIZE.
const MAX_IN_FLIGHT_PARTS: usize = 2;

/// S3-compatible storage implementation (Cloudflare R2 in production)
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    public_base_url: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - Bucket name
    /// * `region` - Region identifier; R2 expects "auto"
    /// * `endpoint_url` - Custom endpoint for S3-compatible providers
    ///   (e.g., "https://{account}.r2.cloudflarestorage.com")
    /// * `public_base_url` - Base URL public object URLs are built from
    ///   (e.g., "https://img.example.com"), without a trailing slash
    pub fn new(
        bucket: String,
        region: Option<String>,
        endpoint_url: Option<String>,
        public_base_url: String,
    ) -> StorageResult<Self> {
        // Credentials come from the environment (AWS_ACCESS_KEY_ID etc.).
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.unwrap_or_else(|| "auto".to_string()))
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Put a spooled file to the store without buffering it whole.
///
/// Files no larger than `chunk_size` go up as a single put. Anything bigger
/// streams through a multipart upload, one `chunk_size` part at a time with a
/// bounded number of parts in flight, so memory use is independent of file
/// size. Returns the byte count sent.
pub(crate) async fn stream_put(
    store: &dyn ObjectStore,
    location: &ObjectPath,
    local_path: &Path,
    content_type: &str,
    chunk_size: usize,
) -> StorageResult<u64> {
    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, content_type.to_string().into());

    let size = tokio::fs::metadata(local_path)
        .await
        .map_err(|e| {
            StorageError::UploadFailed(format!("Failed to stat {}: {}", local_path.display(), e))
        })?
        .len();

    if size <= chunk_size as u64 {
        let data = tokio::fs::read(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read {}: {}", local_path.display(), e))
        })?;
        let mut opts = PutOptions::default();
        opts.attributes = attributes;
        store
            .put_opts(location, PutPayload::from(Bytes::from(data)), opts)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        return Ok(size);
    }

    let mut opts = PutMultipartOptions::default();
    opts.attributes = attributes;
    let upload = store
        .put_multipart_opts(location, opts)
        .await
        .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
    let mut writer = WriteMultipart::new_with_chunk_size(upload, chunk_size);

    let file = tokio::fs::File::open(local_path).await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to open {}: {}", local_path.display(), e))
    })?;
    let mut reader = tokio::io::BufReader::new(file);
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                let _ = writer.abort().await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to read {}: {}",
                    local_path.display(),
                    e
                )));
            }
        };
        if bytes_read == 0 {
            break;
        }
        if let Err(e) = writer.wait_for_capacity(MAX_IN_FLIGHT_PARTS).await {
            let _ = writer.abort().await;
            return Err(StorageError::UploadFailed(e.to_string()));
        }
        writer.write(&buf[..bytes_read]);
    }

    writer
        .finish()
        .await
        .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

    Ok(size)
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<Uploaded> {
        let key = keys::clean_key(key).to_string();
        let location = ObjectPath::from(key.clone());
        let start = std::time::Instant::now();

        let size = stream_put(
            &self.store,
            &location,
            local_path,
            content_type,
            UPLOAD_CHUNK_SIZE,
        )
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            e
        })?;

        let url = keys::public_url(&self.public_base_url, &key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(Uploaded { key, url })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let key = keys::clean_key(key);
        let location = ObjectPath::from(key.to_string());
        let start = std::time::Instant::now();

        match self.store.delete(&location).await {
            Ok(_) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete successful"
                );
                Ok(())
            }
            // Deleting an already-absent object is a success.
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %key, "S3 delete: object already absent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = ObjectPath::from(keys::clean_key(key).to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[tokio::test]
    async fn test_stream_put_small_file_single_put() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("small.jpg");
        tokio::fs::write(&path, b"jpeg bytes").await.unwrap();

        let store = InMemory::new();
        let location = ObjectPath::from("uploads/original/small.jpg");
        let size = stream_put(&store, &location, &path, "image/jpeg", 1024)
            .await
            .unwrap();
        assert_eq!(size, 10);

        let result = store.get(&location).await.unwrap();
        let attrs = result.attributes.clone();
        assert_eq!(attrs.get(&Attribute::ContentType).map(|v| &**v), Some("image/jpeg"));
        assert_eq!(result.bytes().await.unwrap().as_ref(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_stream_put_large_file_uses_multipart_and_keeps_content() {
        // Several times the part size; bytes must arrive intact and in order.
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("big.png");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let store = InMemory::new();
        let location = ObjectPath::from("uploads/original/big.png");
        let size = stream_put(&store, &location, &path, "image/png", 1024)
            .await
            .unwrap();
        assert_eq!(size, data.len() as u64);

        let result = store.get(&location).await.unwrap();
        let attrs = result.attributes.clone();
        assert_eq!(attrs.get(&Attribute::ContentType).map(|v| &**v), Some("image/png"));
        assert_eq!(result.bytes().await.unwrap().as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_stream_put_missing_file_fails() {
        let store = InMemory::new();
        let location = ObjectPath::from("uploads/original/ghost.jpg");
        let err = stream_put(
            &store,
            &location,
            Path::new("/no/such/file"),
            "image/jpeg",
            1024,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
        assert!(store.head(&location).await.is_err());
    }
}
