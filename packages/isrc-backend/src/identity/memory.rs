//! In-process identity provider for the `memory` backend and tests.
//!
//! Passwords are kept as salted SHA-256 digests. ID tokens are opaque random
//! strings mapped back to the account's email; only the most recently issued
//! token per account stays valid. With `auto_verify` set, the
//! "verification email" marks the account verified immediately.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{Account, IdentityProvider, Session};
use crate::error::{Error, Result};

/// Same floor the hosted provider enforces.
const MIN_PASSWORD_LEN: usize = 6;

struct StoredAccount {
    uid: String,
    email: String,
    salt: String,
    password_digest: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
}

impl StoredAccount {
    fn account(&self) -> Account {
        Account {
            uid: self.uid.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
pub struct MemoryIdentity {
    /// Lowercased email -> account
    accounts: Arc<DashMap<String, StoredAccount>>,
    /// ID token -> lowercased email
    sessions: Arc<DashMap<String, String>>,
    /// Lowercased email -> its one live ID token
    latest_tokens: Arc<DashMap<String, String>>,
    auto_verify: bool,
}

impl MemoryIdentity {
    pub fn new(auto_verify: bool) -> Self {
        Self {
            accounts: Arc::new(DashMap::new()),
            sessions: Arc::new(DashMap::new()),
            latest_tokens: Arc::new(DashMap::new()),
            auto_verify,
        }
    }

    fn issue_token(&self, email_key: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), email_key.to_string());
        // A new sign-in replaces the account's previous token.
        if let Some(previous) = self
            .latest_tokens
            .insert(email_key.to_string(), token.clone())
        {
            self.sessions.remove(&previous);
        }
        token
    }

    fn account_for_token(&self, id_token: &str) -> Result<String> {
        self.sessions
            .get(id_token)
            .map(|r| r.value().clone())
            .ok_or(Error::Unauthenticated)
    }

    /// Mark an account's email as verified, as clicking the emailed link would.
    #[cfg(test)]
    pub fn confirm_email(&self, email: &str) {
        if let Some(mut account) = self.accounts.get_mut(&email.to_lowercase()) {
            account.email_verified = true;
        }
    }

    #[cfg(test)]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    #[cfg(test)]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn create_account(&self, email: &str, password: &str) -> Result<Session> {
        if !email.contains('@') {
            return Err(Error::ProviderError("Invalid email address".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::ProviderError(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let key = email.to_lowercase();
        let account = match self.accounts.entry(key.clone()) {
            Entry::Occupied(_) => return Err(Error::DuplicateAccount),
            Entry::Vacant(slot) => {
                let salt = Uuid::new_v4().simple().to_string();
                let stored = StoredAccount {
                    uid: Uuid::new_v4().simple().to_string(),
                    email: email.to_string(),
                    password_digest: digest(&salt, password),
                    salt,
                    email_verified: false,
                    created_at: Utc::now(),
                };
                let account = stored.account();
                slot.insert(stored);
                account
            }
        };

        Ok(Session {
            id_token: self.issue_token(&key),
            account,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let key = email.to_lowercase();
        let account = {
            let stored = self.accounts.get(&key).ok_or(Error::Unauthenticated)?;
            if digest(&stored.salt, password) != stored.password_digest {
                return Err(Error::Unauthenticated);
            }
            stored.account()
        };

        Ok(Session {
            id_token: self.issue_token(&key),
            account,
        })
    }

    async fn send_verification(&self, id_token: &str) -> Result<()> {
        let key = self.account_for_token(id_token)?;
        let mut stored = self
            .accounts
            .get_mut(&key)
            .ok_or_else(|| Error::ProviderError("Account no longer exists".to_string()))?;

        if self.auto_verify {
            stored.email_verified = true;
        }
        tracing::info!(
            uid = stored.uid.as_str(),
            auto_verified = self.auto_verify,
            "Verification email queued"
        );
        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<Account> {
        let key = self.account_for_token(id_token)?;
        self.accounts
            .get(&key)
            .map(|stored| stored.account())
            .ok_or_else(|| Error::ProviderError("Account no longer exists".to_string()))
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
