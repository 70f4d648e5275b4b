//! Blob storage for uploaded files.
//!
//! [`BlobStore`] is the raw object store; [`BlobUploader`] chooses the object
//! path (`{prefix}/{timestamp}-{filename}`) and hands back a download URL.
//! Filenames are stored verbatim.

pub mod firebase;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;

pub use firebase::FirebaseStorage;
pub use memory::MemoryBlobStore;

/// Content type used when the client did not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` at `path` and return a publicly resolvable URL.
    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct BlobUploader {
    store: Arc<dyn BlobStore>,
    prefix: &'static str,
}

impl BlobUploader {
    pub fn new(store: Arc<dyn BlobStore>, prefix: &'static str) -> Self {
        Self { store, prefix }
    }

    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let path = object_path(self.prefix, Utc::now().timestamp_micros(), filename);
        let size = bytes.len();
        let url = self
            .store
            .put_object(&path, bytes, content_type.unwrap_or(DEFAULT_CONTENT_TYPE))
            .await?;

        tracing::info!(path = path.as_str(), size, "Blob uploaded");
        Ok(url)
    }
}

fn object_path(prefix: &str, timestamp_micros: i64, filename: &str) -> String {
    format!("{}/{}-{}", prefix, timestamp_micros, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path() {
        assert_eq!(
            object_path("certificates", 1_700_000_000_000_123, "cert.pdf"),
            "certificates/1700000000000123-cert.pdf"
        );
    }

    #[test]
    fn test_object_path_keeps_filename_verbatim() {
        assert_eq!(
            object_path("certificates", 1, "../a b.pdf"),
            "certificates/1-../a b.pdf"
        );
    }

    #[tokio::test]
    async fn test_upload_writes_under_prefix() {
        let store = MemoryBlobStore::new();
        let uploader = BlobUploader::new(Arc::new(store.clone()), "certificates");

        let url = uploader
            .upload("cert.pdf", b"%PDF".to_vec(), Some("application/pdf"))
            .await
            .unwrap();

        let paths = store.paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with("certificates/"));
        assert!(paths[0].ends_with("-cert.pdf"));
        assert_eq!(url, store.url_for(&paths[0]));

        let object = store.object(&paths[0]).unwrap();
        assert_eq!(object.bytes, b"%PDF");
        assert_eq!(object.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_upload_defaults_content_type() {
        let store = MemoryBlobStore::new();
        let uploader = BlobUploader::new(Arc::new(store.clone()), "certificates");
        uploader.upload("raw", vec![1, 2, 3], None).await.unwrap();

        let path = store.paths().remove(0);
        assert_eq!(store.object(&path).unwrap().content_type, DEFAULT_CONTENT_TYPE);
    }
}
