//! Registration and login rules.
//!
//! Registration runs three side effects in a fixed order: provider account
//! creation, profile mirror write, verification email. They are not
//! transactional; a failure part-way leaves the earlier effects in place.

use std::sync::Arc;

use serde_json::json;

use super::{Account, IdentityProvider, Session};
use crate::error::{Error, Result};
use crate::records::{iso_now, RecordStore, USERS};

pub const CREDENTIALS_REQUIRED: &str = "Email and Password are required";

#[derive(Clone)]
pub struct IdentityGateway {
    provider: Arc<dyn IdentityProvider>,
    records: Arc<dyn RecordStore>,
}

impl IdentityGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>, records: Arc<dyn RecordStore>) -> Self {
        Self { provider, records }
    }

    /// Create an account, mirror its profile, and send the verification email.
    ///
    /// The returned session's account is unverified.
    pub async fn register(&self, email: &str, password: &str) -> Result<Session> {
        require_credentials(email, password)?;

        let session = self.provider.create_account(email, password).await?;
        let account = &session.account;
        tracing::info!(uid = account.uid.as_str(), "Account created");

        self.records
            .put(
                USERS,
                &account.uid,
                json!({
                    "uid": account.uid,
                    "email": account.email,
                    "createdAt": iso_now(),
                }),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    uid = account.uid.as_str(),
                    error = %e,
                    "Account created but profile mirror failed"
                );
                e
            })?;

        self.provider.send_verification(&session.id_token).await?;
        tracing::info!(uid = account.uid.as_str(), "Verification email sent");

        Ok(session)
    }

    /// Check credentials and require a verified email.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        require_credentials(email, password)?;

        let session = self.provider.sign_in(email, password).await?;
        let account: Account = self.provider.lookup(&session.id_token).await?;

        if !account.email_verified {
            tracing::info!(uid = account.uid.as_str(), "Login refused, email not verified");
            return Err(Error::EmailNotVerified);
        }

        Ok(Session {
            account,
            id_token: session.id_token,
        })
    }
}

fn require_credentials(email: &str, password: &str) -> Result<()> {
    if email.is_empty() || password.is_empty() {
        return Err(Error::InvalidInput(CREDENTIALS_REQUIRED.to_string()));
    }
    Ok(())
}
