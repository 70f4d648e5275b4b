//! In-process blob store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::BlobStore;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
pub struct MemoryBlobStore {
    objects: Arc<DashMap<String, StoredObject>>,
    base_url: String,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_base_url("memory://blobs")
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            objects: Arc::new(DashMap::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(path))
    }

    #[cfg(test)]
    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.get(path).map(|r| r.value().clone())
    }

    #[cfg(test)]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.iter().map(|r| r.key().clone()).collect();
        paths.sort();
        paths
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let object = StoredObject {
            bytes,
            content_type: content_type.to_string(),
        };
        tracing::debug!(
            path,
            size = object.bytes.len(),
            content_type = object.content_type.as_str(),
            "Object stored"
        );
        self.objects.insert(path.to_string(), object);
        Ok(self.url_for(path))
    }
}
