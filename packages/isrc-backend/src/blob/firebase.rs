//! Firebase Storage adapter (REST).
//!
//! Uploads with `POST {base}/b/{bucket}/o?name={path}` and builds the
//! token-bearing download URL the Firebase SDKs hand out:
//! `{base}/b/{bucket}/o/{encoded path}?alt=media&token={downloadToken}`.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;

use super::BlobStore;
use crate::error::{Error, Result};

/// Object metadata returned by the upload endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    /// Comma-separated list; the first token is used.
    download_tokens: Option<String>,
}

pub struct FirebaseStorage {
    client: Client,
    /// e.g. `https://firebasestorage.googleapis.com/v0`
    base_url: String,
    bucket: String,
}

impl FirebaseStorage {
    pub fn new(client: Client, base_url: &str, bucket: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/b/{}/o", self.base_url, self.bucket)
    }

    fn download_url(&self, name: &str, token: &str) -> String {
        format!(
            "{}/b/{}/o/{}?alt=media&token={}",
            self.base_url,
            self.bucket,
            urlencoding::encode(name),
            token
        )
    }
}

#[async_trait]
impl BlobStore for FirebaseStorage {
    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let response = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", path)])
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                path,
                body = body.as_str(),
                "Storage upload rejected"
            );
            return Err(Error::StoreUnavailable(format!(
                "storage responded {}: {}",
                status, body
            )));
        }

        let metadata: ObjectMetadata = response
            .json()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("Invalid upload response: {}", e)))?;

        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::StoreUnavailable("Upload response carried no download token".to_string())
            })?;

        Ok(self.download_url(&metadata.name, token))
    }
}
