//! Certificate records: upload a file under an auth code, verify by code.
//!
//! An upload writes the file to blob storage first, then appends
//! `{ id, authCode, certificateUrl, uploadedAt }` to `certificates`. If the
//! append fails the blob stays where it is. Auth codes are not unique;
//! verification returns the earliest record carrying the code.

pub mod api;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::blob::BlobUploader;
use crate::error::{Error, Result};
use crate::records::{server_timestamp, RecordStore, CERTIFICATES};

/// Blob namespace for certificate files.
pub const BLOB_PREFIX: &str = "certificates";

pub const NO_RECORD: &str = "No record found for this Auth Code";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub id: String,
    pub auth_code: String,
    pub certificate_url: String,
    /// Milliseconds since the epoch, stamped by the record store.
    pub uploaded_at: Option<i64>,
}

#[derive(Clone)]
pub struct CertificateRegistry {
    records: Arc<dyn RecordStore>,
    uploader: BlobUploader,
}

impl CertificateRegistry {
    pub fn new(records: Arc<dyn RecordStore>, uploader: BlobUploader) -> Self {
        Self { records, uploader }
    }

    /// Store the certificate file and record it under `auth_code`.
    ///
    /// Returns the download URL.
    pub async fn upload(
        &self,
        auth_code: &str,
        filename: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let url = self.uploader.upload(filename, bytes, content_type).await?;

        let id = self
            .records
            .append(
                CERTIFICATES,
                json!({
                    "authCode": auth_code,
                    "certificateUrl": url,
                    "uploadedAt": server_timestamp(),
                }),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    url = url.as_str(),
                    error = %e,
                    "Certificate blob stored but record append failed"
                );
                e
            })?;

        tracing::info!(id = id.as_str(), "Certificate recorded");
        Ok(url)
    }

    /// Look up the earliest certificate recorded under `auth_code`.
    pub async fn verify(&self, auth_code: &str) -> Result<CertificateRecord> {
        let matches_code =
            |record: &Value| record.get("authCode").and_then(Value::as_str) == Some(auth_code);

        let found = self
            .records
            .scan_first_match(CERTIFICATES, &matches_code)
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound(NO_RECORD.to_string()),
                other => other,
            })?;

        serde_json::from_value(found.value).map_err(|e| {
            Error::StoreUnavailable(format!("Malformed certificate record {}: {}", found.key, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::records::MemoryRecordStore;

    fn registry() -> (CertificateRegistry, MemoryRecordStore, MemoryBlobStore) {
        let records = MemoryRecordStore::new();
        let blobs = MemoryBlobStore::new();
        let registry = CertificateRegistry::new(
            Arc::new(records.clone()),
            BlobUploader::new(Arc::new(blobs.clone()), BLOB_PREFIX),
        );
        (registry, records, blobs)
    }

    #[tokio::test]
    async fn test_upload_then_verify() {
        let (registry, records, _blobs) = registry();
        let url = registry
            .upload("CODE-1", "cert.pdf", b"%PDF-1.7".to_vec(), Some("application/pdf"))
            .await
            .unwrap();

        let record = registry.verify("CODE-1").await.unwrap();
        assert_eq!(record.certificate_url, url);
        assert_eq!(record.auth_code, "CODE-1");
        assert!(record.uploaded_at.is_some());

        let stored = records.records(CERTIFICATES);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].key, record.id);
    }

    #[tokio::test]
    async fn test_verify_unknown_code() {
        let (registry, _records, _blobs) = registry();
        registry
            .upload("CODE-1", "cert.pdf", vec![1], None)
            .await
            .unwrap();

        match registry.verify("CODE-2").await.unwrap_err() {
            Error::NotFound(msg) => assert_eq!(msg, NO_RECORD),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_resolves_to_first_upload() {
        let (registry, _records, _blobs) = registry();
        let first = registry
            .upload("DUP", "first.pdf", vec![1], None)
            .await
            .unwrap();
        let second = registry
            .upload("DUP", "second.pdf", vec![2], None)
            .await
            .unwrap();
        assert_ne!(first, second);

        assert_eq!(registry.verify("DUP").await.unwrap().certificate_url, first);
    }

    #[tokio::test]
    async fn test_malformed_record_is_a_store_error() {
        let (registry, records, _blobs) = registry();
        records
            .append(CERTIFICATES, json!({ "authCode": "BAD" }))
            .await
            .unwrap();

        assert!(matches!(
            registry.verify("BAD").await.unwrap_err(),
            Error::StoreUnavailable(_)
        ));
    }
}
