//! Backend handles shared by all routes.
//!
//! Built once at startup and cloned (cheaply, via `Arc`) into each route
//! group's state. Handlers only see the trait objects.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::blob::{BlobStore, FirebaseStorage, MemoryBlobStore};
use crate::config::{BackendConfig, ConfigError, FirebaseConfig, ServerConfig};
use crate::identity::{FirebaseIdentity, IdentityProvider, MemoryIdentity};
use crate::records::{MemoryRecordStore, RealtimeDatabase, RecordStore};

#[derive(Clone)]
pub struct Backends {
    pub identity: Arc<dyn IdentityProvider>,
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Backends {
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        match &config.backend {
            BackendConfig::Firebase(firebase) => Self::firebase(firebase, config.request_timeout),
            BackendConfig::Memory { auto_verify } => Ok(Self::memory(*auto_verify)),
        }
    }

    /// Firebase adapters sharing one HTTP connection pool.
    pub fn firebase(config: &FirebaseConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            identity: Arc::new(FirebaseIdentity::new(
                client.clone(),
                &config.identity_base_url,
                &config.api_key,
            )),
            records: Arc::new(RealtimeDatabase::new(
                client.clone(),
                &config.database_url,
                config.database_auth.clone(),
            )),
            blobs: Arc::new(FirebaseStorage::new(
                client,
                &config.storage_base_url,
                &config.storage_bucket,
            )),
        })
    }

    pub fn memory(auto_verify: bool) -> Self {
        Self {
            identity: Arc::new(MemoryIdentity::new(auto_verify)),
            records: Arc::new(MemoryRecordStore::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }
}
