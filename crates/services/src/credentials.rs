//! # Credential Verifier
//!
//! Checks a login attempt against the stored digest. Every attempt performs
//! exactly one hash comparison: when the identifier matches nobody the
//! comparison runs against a dummy digest, so unknown users and wrong
//! passwords cost the same and fail the same way.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use domains::{CredentialHasher, DomainError, Result, User, UserRepository};

/// Plaintext behind the dummy digest. Its value is irrelevant; only its cost is.
const DUMMY_PASSWORD: &str = "forum-board:dummy-credential";

pub struct CredentialVerifier {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    dummy_digest: OnceCell<String>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { users, hasher, dummy_digest: OnceCell::new() }
    }

    /// Computes the dummy digest up front so the first failed lookup is not an
    /// outlier. Safe to call more than once.
    pub fn prepare(&self) -> Result<()> {
        self.dummy_digest().map(|_| ())
    }

    /// Returns the full record (digest included) on success so the caller can
    /// project it. Every failure is [`DomainError::AuthenticationFailed`].
    pub async fn verify(&self, identifier: &str, password: &str) -> Result<User> {
        let candidate = self.users.find_by_identifier(identifier).await?;

        let digest = match &candidate {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_digest()?.to_owned(),
        };
        let matched = self.compare(password, digest).await?;

        match candidate {
            Some(user) if matched && user.is_active => Ok(user),
            _ => Err(DomainError::AuthenticationFailed),
        }
    }

    fn dummy_digest(&self) -> Result<&str> {
        self.dummy_digest
            .get_or_try_init(|| self.hasher.hash(DUMMY_PASSWORD))
            .map(String::as_str)
            .map_err(|e| DomainError::Internal(e.to_string()))
    }

    // Hashing is CPU-bound; keep it off the async workers.
    async fn compare(&self, password: &str, digest: String) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| DomainError::Internal(format!("hash worker failed: {e}")))
    }
}
