//! Identity: account registration and login.
//!
//! The identity provider owns accounts, passwords and email verification.
//! [`IdentityGateway`] layers the registration and login rules on top of it
//! and mirrors each new account into the record store under `users/{uid}`.

pub mod api;
pub mod firebase;
pub mod gateway;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use firebase::FirebaseIdentity;
pub use gateway::IdentityGateway;
pub use memory::MemoryIdentity;

/// An account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// An account together with the provider-issued ID token.
#[derive(Debug, Clone)]
pub struct Session {
    pub account: Account,
    pub id_token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    ///
    /// Fails with `DuplicateAccount` when the email is already registered.
    async fn create_account(&self, email: &str, password: &str) -> Result<Session>;

    /// Check credentials. Fails with `Unauthenticated` on a bad email/password pair.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Send the verification email for the account behind `id_token`.
    async fn send_verification(&self, id_token: &str) -> Result<()>;

    /// Current state of the account behind `id_token`, including verification.
    async fn lookup(&self, id_token: &str) -> Result<Account>;
}
