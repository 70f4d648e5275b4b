//! Firebase Authentication adapter (Identity Toolkit REST API).
//!
//! - `accounts:signUp` creates an account and returns an ID token
//! - `accounts:signInWithPassword` checks credentials
//! - `accounts:sendOobCode` with `VERIFY_EMAIL` sends the verification email
//! - `accounts:lookup` reports `emailVerified`
//!
//! Provider error codes (`EMAIL_EXISTS`, `INVALID_PASSWORD`, ...) are mapped
//! to [`Error`] here so nothing above this module sees them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Account, IdentityProvider, Session};
use crate::error::{Error, Result};

pub struct FirebaseIdentity {
    client: Client,
    /// e.g. `https://identitytoolkit.googleapis.com/v1`
    base_url: String,
    api_key: String,
}

/// Response of `signUp` and `signInWithPassword`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    email_verified: bool,
    /// Milliseconds since the epoch, as a decimal string.
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

impl FirebaseIdentity {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}", self.base_url, method)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(method))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| Error::ProviderError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| Error::ProviderError(format!("Invalid {} response: {}", method, e)));
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => {
                tracing::debug!(method, code = envelope.error.message.as_str(), "Identity provider rejected request");
                Err(map_provider_error(&envelope.error.message))
            }
            Err(_) => Err(Error::ProviderError(format!(
                "{} responded {}: {}",
                method, status, body
            ))),
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn create_account(&self, email: &str, password: &str) -> Result<Session> {
        let response: TokenResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        Ok(Session {
            account: Account {
                uid: response.local_id,
                email: response.email,
                email_verified: false,
                created_at: Utc::now(),
            },
            id_token: response.id_token,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response: TokenResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        // signInWithPassword does not report verification; callers use lookup.
        Ok(Session {
            account: Account {
                uid: response.local_id,
                email: response.email,
                email_verified: false,
                created_at: Utc::now(),
            },
            id_token: response.id_token,
        })
    }

    async fn send_verification(&self, id_token: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                &json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token }),
            )
            .await?;
        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<Account> {
        let response: LookupResponse = self
            .call("lookup", &json!({ "idToken": id_token }))
            .await?;

        let user = response
            .users
            .into_iter()
            .next()
            .ok_or(Error::Unauthenticated)?;

        Ok(Account {
            uid: user.local_id,
            email: user.email,
            email_verified: user.email_verified,
            created_at: parse_created_at(user.created_at.as_deref()),
        })
    }
}

/// Map an Identity Toolkit error message to an [`Error`].
///
/// Messages look like `EMAIL_EXISTS` or
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
fn map_provider_error(message: &str) -> Error {
    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), Some(detail.trim())),
        None => (message.trim(), None),
    };

    match code {
        "EMAIL_EXISTS" => Error::DuplicateAccount,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED"
        | "INVALID_ID_TOKEN" | "USER_NOT_FOUND" => Error::Unauthenticated,
        "WEAK_PASSWORD" => Error::ProviderError(
            detail
                .unwrap_or("Password is too weak")
                .to_string(),
        ),
        _ => Error::ProviderError(message.to_string()),
    }
}

fn parse_created_at(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}
