//! Login: verify credentials, resolve roles, issue a token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use domains::{
    DomainError, Result, RoleId, SessionTokens, UserProfile, UserRepository,
};

use crate::credentials::CredentialVerifier;
use crate::role_directory::RoleDirectory;

/// What a successful login hands back to the transport.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
    pub roles: Vec<RoleId>,
}

pub struct SessionService {
    verifier: CredentialVerifier,
    directory: RoleDirectory,
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn SessionTokens>,
}

impl SessionService {
    pub fn new(
        verifier: CredentialVerifier,
        directory: RoleDirectory,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn SessionTokens>,
    ) -> Self {
        Self { verifier, directory, users, tokens }
    }

    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    #[tracing::instrument(name = "login", skip_all)]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome> {
        if identifier.trim().is_empty() || password.is_empty() {
            return Err(DomainError::Validation("identifier and password are required".into()));
        }

        let user = match self.verifier.verify(identifier, password).await {
            Ok(user) => user,
            Err(DomainError::AuthenticationFailed) => {
                tracing::warn!("login rejected");
                return Err(DomainError::AuthenticationFailed);
            }
            Err(other) => return Err(other),
        };

        let roles = self.directory.resolve_roles(user.id).await?;
        let now = Utc::now();
        let profile = user.profile();
        let issued = self
            .tokens
            .issue(&profile, &roles, now)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        // Bookkeeping only; a failed stamp must not cost the user their session.
        if let Err(e) = self.users.record_login(user.id, now).await {
            tracing::warn!(user_id = %user.id, error = %e, "could not record last login");
        }

        tracing::info!(user_id = %user.id, roles = roles.len(), "login succeeded");
        Ok(LoginOutcome { token: issued.token, expires_at: issued.expires_at, user: profile, roles })
    }
}
