//! Object storage behind a trait so the pipeline and routes never care
//! where the bytes live. The filesystem implementation serves production;
//! tests substitute failing stores to exercise partial-failure paths.

pub mod upload;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use self::upload::{process_batch, BatchOutcome, UploadFailure, UploadedFile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError>;
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
    /// Publicly-resolvable URL for a stored object.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Stores objects under `{root}/{bucket}/{key}` and hands out URLs under
/// `{public_base}/objects/{bucket}/{key}`, served by the objects route.
pub struct FsObjectStore {
    root: PathBuf,
    public_base: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        validate_key_component(bucket)?;
        for part in key.split('/') {
            validate_key_component(part)?;
        }
        Ok(self.root.join(bucket).join(key))
    }
}

fn validate_key_component(part: &str) -> Result<(), StoreError> {
    if part.is_empty() || part == "." || part == ".." || part.contains('\\') {
        return Err(StoreError::InvalidKey(part.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/objects/{}/{}", self.public_base, bucket, key)
    }
}

/// Invert a public object URL back into (bucket, key) for cleanup on
/// deletion. URLs that don't point at our object route (externally hosted
/// photos) return None and skip cleanup.
pub fn parse_object_url(url: &str) -> Option<(String, String)> {
    let (_, rest) = url.split_once("/objects/")?;
    let (bucket, key) = rest.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket.to_string(), key.to_string()))
}

/// Resolve a request path to an object file, rejecting traversal.
pub fn safe_object_path(root: &Path, bucket: &str, key: &str) -> Option<PathBuf> {
    validate_key_component(bucket).ok()?;
    for part in key.split('/') {
        validate_key_component(part).ok()?;
    }
    Some(root.join(bucket).join(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path(), "http://localhost:3000");

        store
            .put("photos", "alice/a.jpg", Bytes::from_static(b"jpeg"))
            .await
            .unwrap();
        let on_disk = tmp.path().join("photos/alice/a.jpg");
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"jpeg");

        store.delete("photos", "alice/a.jpg").await.unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn delete_of_missing_object_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path(), "http://localhost:3000");
        assert!(store.delete("photos", "nope.jpg").await.is_err());
    }

    #[tokio::test]
    async fn traversal_keys_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path(), "http://localhost:3000");
        let err = store
            .put("photos", "../escape.jpg", Bytes::from_static(b"x"))
            .await;
        assert!(matches!(err, Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn public_url_and_parse_are_inverses() {
        let store = FsObjectStore::new("/data", "http://host:3000");
        let url = store.public_url("photos", "alice/123_abc.jpg");
        assert_eq!(url, "http://host:3000/objects/photos/alice/123_abc.jpg");
        assert_eq!(
            parse_object_url(&url),
            Some(("photos".to_string(), "alice/123_abc.jpg".to_string()))
        );
    }

    #[test]
    fn parse_rejects_foreign_urls() {
        assert_eq!(parse_object_url("https://example.com/cat.jpg"), None);
        assert_eq!(parse_object_url("http://host/objects/"), None);
        assert_eq!(parse_object_url("http://host/objects/bucketonly"), None);
    }

    #[test]
    fn safe_object_path_blocks_dotdot() {
        let root = Path::new("/data");
        assert!(safe_object_path(root, "photos", "a/../../etc/passwd").is_none());
        assert!(safe_object_path(root, "..", "x.jpg").is_none());
        assert!(safe_object_path(root, "photos", "alice/x.jpg").is_some());
    }
}
