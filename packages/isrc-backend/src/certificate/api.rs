//! Certificate upload/verify handlers.
//!
//! - `POST /upload` - multipart form with an `authCode` text field and a
//!   `certificate` file field
//! - `POST /verify` - `{ authCode }`

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use super::CertificateRegistry;
use crate::error::{ApiError, Error};
use crate::fields::{body_or_default, lenient_string};

const UPLOAD_FAILED: &str = "Error uploading file";
const VERIFY_FAILED: &str = "Error fetching data";
const UPLOAD_FIELDS_REQUIRED: &str = "Auth Code and Certificate are required";
const AUTH_CODE_REQUIRED: &str = "Auth Code is required";

/// Used when the file part carries no filename.
const FALLBACK_FILENAME: &str = "certificate";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub auth_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub certificate_url: String,
}

struct CertificateFile {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

fn invalid(msg: &str) -> ApiError {
    ApiError::new(Error::InvalidInput(msg.to_string()), UPLOAD_FAILED)
}

/// POST /upload
///
/// The whole file is buffered in memory before anything is written.
pub async fn upload(
    State(registry): State<CertificateRegistry>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(reason = %rejection.body_text(), "Upload is not a multipart form");
        invalid(UPLOAD_FIELDS_REQUIRED)
    })?;
    let mut auth_code: Option<String> = None;
    let mut file: Option<CertificateFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed multipart upload");
                return Err(invalid(UPLOAD_FIELDS_REQUIRED));
            }
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "authCode" => {
                let text = field.text().await.map_err(|e| {
                    tracing::warn!(error = %e, "Failed to read authCode field");
                    invalid(UPLOAD_FIELDS_REQUIRED)
                })?;
                auth_code = Some(text).filter(|t| !t.is_empty());
            }
            "certificate" => {
                let filename = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(FALLBACK_FILENAME)
                    .to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::warn!(error = %e, "Failed to read certificate bytes");
                    invalid("Failed to read certificate data")
                })?;
                file = Some(CertificateFile {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {
                // Skip unknown fields
            }
        }
    }

    let (auth_code, file) = match (auth_code, file) {
        (Some(code), Some(file)) => (code, file),
        _ => return Err(invalid(UPLOAD_FIELDS_REQUIRED)),
    };

    let download_url = registry
        .upload(
            &auth_code,
            &file.filename,
            file.bytes,
            file.content_type.as_deref(),
        )
        .await
        .map_err(ApiError::with(UPLOAD_FAILED))?;

    Ok(Json(UploadResponse {
        message: "Upload successful".to_string(),
        download_url,
    }))
}

/// POST /verify
pub async fn verify(
    State(registry): State<CertificateRegistry>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let req = body_or_default(payload);
    let auth_code = req.auth_code.ok_or_else(|| {
        ApiError::new(
            Error::InvalidInput(AUTH_CODE_REQUIRED.to_string()),
            VERIFY_FAILED,
        )
    })?;

    let record = registry
        .verify(&auth_code)
        .await
        .map_err(ApiError::with(VERIFY_FAILED))?;

    Ok(Json(VerifyResponse {
        certificate_url: record.certificate_url,
    }))
}
