//! Storage gateway: a uniform store/fetch/delete/temporary-URL contract
//! over a pluggable blob backend.
//!
//! Paths are opaque identifiers; callers never assume a filesystem layout.
//! Two backends ship here: S3-compatible object storage (production) and a
//! local filesystem tree (development and tests).

use crate::config::StorageConfig;
use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Result of storing an object
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// Opaque backend path
    pub path: String,
    /// Stable access URL
    pub url: String,
    /// Stored size in bytes
    pub size: usize,
}

/// A time-limited access link to a stored object
#[derive(Debug, Clone, PartialEq)]
pub struct TemporaryUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Capability contract every blob backend implements
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store bytes under the given opaque name within a container
    async fn store(&self, bytes: &[u8], name: &str, container: &str) -> Result<StoredObject>;

    /// Fetch an object; `None` when it does not exist
    async fn fetch(&self, path: &str, container: &str) -> Result<Option<Vec<u8>>>;

    /// Delete an object. Idempotent: deleting a missing object returns
    /// `false`, never an error.
    async fn delete(&self, path: &str, container: &str) -> Result<bool>;

    /// Mint a time-limited access URL; `None` when the object is missing
    async fn temporary_url(
        &self,
        path: &str,
        container: &str,
        ttl: Duration,
    ) -> Result<Option<TemporaryUrl>>;

    /// Whether an object exists
    async fn exists(&self, path: &str, container: &str) -> Result<bool>;

    /// Backend tag recorded on photo records ("s3", "filesystem")
    fn provider(&self) -> &'static str;
}

/// Generate the storage name for a photo variant.
/// Format: photos/{owner_id}/{photo_id}/{variant}_{sanitized-filename}
pub fn object_name(owner_id: Uuid, photo_id: Uuid, variant: &str, file_name: &str) -> String {
    format!(
        "photos/{}/{}/{}_{}",
        owner_id,
        photo_id,
        variant,
        crate::photo::sanitize_file_name(file_name)
    )
}

/// Content type for a stored object, from its filename extension
fn content_type_for(name: &str) -> &'static str {
    let extension = name.rsplit('.').next().unwrap_or("").to_lowercase();
    match extension.as_str() {
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "tif" | "tiff" => "image/tiff",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// S3-compatible object storage backend
pub struct S3Storage {
    client: S3Client,
    region: String,
    endpoint_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3 backend
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            container = %config.container,
            region = %config.region,
            "S3 storage backend initialized"
        );

        Ok(Self {
            client,
            region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
        })
    }

    fn public_url(&self, container: &str, path: &str) -> String {
        match &self.endpoint_url {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), container, path),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", container, self.region, path),
        }
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    #[instrument(skip(self, bytes), fields(name = %name, size = bytes.len()))]
    async fn store(&self, bytes: &[u8], name: &str, container: &str) -> Result<StoredObject> {
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(container)
            .key(name)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(content_type_for(name))
            .send()
            .await
            .map_err(|e| CatalogError::Storage(format!("put_object failed: {}", e)))?;

        debug!(path = %name, size_bytes = size, "Object stored");

        Ok(StoredObject {
            path: name.to_string(),
            url: self.public_url(container, name),
            size,
        })
    }

    async fn fetch(&self, path: &str, container: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_object()
            .bucket(container)
            .key(path)
            .send()
            .await;

        match response {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| CatalogError::Storage(format!("read body failed: {}", e)))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(e) => {
                if e.as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false)
                {
                    Ok(None)
                } else {
                    Err(CatalogError::Storage(format!("get_object failed: {}", e)))
                }
            }
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &str, container: &str) -> Result<bool> {
        // S3 deletes are already idempotent; report whether the object was
        // there so callers can distinguish the no-op.
        let existed = self.exists(path, container).await?;

        self.client
            .delete_object()
            .bucket(container)
            .key(path)
            .send()
            .await
            .map_err(|e| CatalogError::Storage(format!("delete_object failed: {}", e)))?;

        debug!(path = %path, existed = existed, "Object deleted");
        Ok(existed)
    }

    async fn temporary_url(
        &self,
        path: &str,
        container: &str,
        ttl: Duration,
    ) -> Result<Option<TemporaryUrl>> {
        if !self.exists(path, container).await? {
            return Ok(None);
        }

        let presigning_config = PresigningConfig::expires_in(ttl)
            .map_err(|e| CatalogError::Storage(format!("invalid presign ttl: {}", e)))?;

        let presigned = self
            .client
            .get_object()
            .bucket(container)
            .key(path)
            .presigned(presigning_config)
            .await
            .map_err(|e| CatalogError::Storage(format!("presign failed: {}", e)))?;

        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| CatalogError::Storage(format!("invalid presign ttl: {}", e)))?;

        metrics::counter!("catalog.storage.urls_issued").increment(1);

        Ok(Some(TemporaryUrl {
            url: presigned.uri().to_string(),
            expires_at,
        }))
    }

    async fn exists(&self, path: &str, container: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(container)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(CatalogError::Storage(format!("head_object failed: {}", e)))
                }
            }
        }
    }

    fn provider(&self) -> &'static str {
        "s3"
    }
}

/// Local filesystem backend. Containers map to subdirectories of the root.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, container: &str, path: &str) -> PathBuf {
        // Paths are generated by this service, but reject traversal anyway.
        let safe: PathBuf = Path::new(path)
            .components()
            .filter(|c| matches!(c, std::path::Component::Normal(_)))
            .collect();
        self.root.join(container).join(safe)
    }
}

#[async_trait]
impl StorageBackend for FsStorage {
    #[instrument(skip(self, bytes), fields(name = %name, size = bytes.len()))]
    async fn store(&self, bytes: &[u8], name: &str, container: &str) -> Result<StoredObject> {
        let full = self.full_path(container, name);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CatalogError::Storage(format!("create dir failed: {}", e)))?;
        }

        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| CatalogError::Storage(format!("write failed: {}", e)))?;

        Ok(StoredObject {
            path: name.to_string(),
            url: format!("file://{}", full.display()),
            size: bytes.len(),
        })
    }

    async fn fetch(&self, path: &str, container: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.full_path(container, path)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CatalogError::Storage(format!("read failed: {}", e))),
        }
    }

    async fn delete(&self, path: &str, container: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.full_path(container, path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CatalogError::Storage(format!("remove failed: {}", e))),
        }
    }

    async fn temporary_url(
        &self,
        path: &str,
        container: &str,
        ttl: Duration,
    ) -> Result<Option<TemporaryUrl>> {
        if !self.exists(path, container).await? {
            return Ok(None);
        }

        // No signing on the local backend; the expiry is advisory.
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| CatalogError::Storage(format!("invalid ttl: {}", e)))?;

        Ok(Some(TemporaryUrl {
            url: format!("file://{}", self.full_path(container, path).display()),
            expires_at,
        }))
    }

    async fn exists(&self, path: &str, container: &str) -> Result<bool> {
        Ok(self.full_path(container, path).is_file())
    }

    fn provider(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_layout() {
        let owner = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();
        let photo = Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap();

        let name = object_name(owner, photo, "original", "My Photo.jpg");
        assert_eq!(
            name,
            "photos/11111111-1111-1111-1111-111111111111/\
             22222222-2222-2222-2222-222222222222/original_My_Photo.jpg"
        );
    }

    #[test]
    fn test_object_name_sanitizes_traversal() {
        let owner = Uuid::new_v4();
        let photo = Uuid::new_v4();
        let name = object_name(owner, photo, "original", "../../etc/passwd");
        assert!(name.ends_with("original_passwd"));
        assert!(!name.contains(".."));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_fs_store_fetch_delete() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsStorage::new(dir.path());

        let stored = backend
            .store(b"photo bytes", "photos/a/b/original_x.jpg", "photos")
            .await
            .unwrap();
        assert_eq!(stored.size, 11);
        assert!(backend.exists(&stored.path, "photos").await.unwrap());

        let fetched = backend.fetch(&stored.path, "photos").await.unwrap();
        assert_eq!(fetched.unwrap(), b"photo bytes");

        assert!(backend.delete(&stored.path, "photos").await.unwrap());
        // Second delete is a no-op, not an error.
        assert!(!backend.delete(&stored.path, "photos").await.unwrap());
        assert!(backend.fetch(&stored.path, "photos").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fs_temporary_url_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsStorage::new(dir.path());

        let url = backend
            .temporary_url("photos/nope.jpg", "photos", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn test_fs_temporary_url_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsStorage::new(dir.path());
        backend.store(b"x", "p/a.jpg", "photos").await.unwrap();

        let before = Utc::now();
        let url = backend
            .temporary_url("p/a.jpg", "photos", Duration::from_secs(3600))
            .await
            .unwrap()
            .unwrap();

        let offset = url.expires_at - before;
        assert!(offset >= chrono::Duration::seconds(3599));
        assert!(offset <= chrono::Duration::seconds(3601));
    }
}
