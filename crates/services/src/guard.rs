//! # Authorization Guard
//!
//! Per-request decision function:
//!
//! ```text
//! Unauthenticated --token--> Parsed --valid & unexpired--> Authenticated{claims}
//!                                                               |
//!                                                     Allowed | Denied(reason)
//! ```
//!
//! Any parse failure collapses straight to `Denied(Unauthorized)`. Destructive
//! decisions consult the role directory, never the roles embedded in the token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use domains::{
    DirectoryError, DomainError, SessionClaims, SessionTokens, UserId, ADMIN_ROLE_ID,
};

use crate::role_directory::RoleDirectory;

/// What the caller is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreatePost,
    DeletePost { author_id: UserId },
    ReadThread,
    ListPosts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No token, or a token that failed to parse.
    Unauthorized,
    /// Valid token, insufficient privilege or ownership.
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Converts a denial into the matching caller-visible error.
    pub fn into_result(self) -> Result<(), DomainError> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(reason) => Err(reason.into()),
        }
    }
}

impl From<DenyReason> for DomainError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthorized => DomainError::AuthenticationFailed,
            DenyReason::Forbidden => DomainError::Forbidden,
        }
    }
}

#[derive(Clone)]
pub struct AuthorizationGuard {
    tokens: Arc<dyn SessionTokens>,
    directory: RoleDirectory,
}

impl AuthorizationGuard {
    pub fn new(tokens: Arc<dyn SessionTokens>, directory: RoleDirectory) -> Self {
        Self { tokens, directory }
    }

    /// Moves a request from `Unauthenticated` to `Authenticated`, or denies it.
    pub fn authenticate(&self, token: Option<&str>) -> Result<SessionClaims, DenyReason> {
        self.authenticate_at(token, Utc::now())
    }

    pub fn authenticate_at(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, DenyReason> {
        let token = token.ok_or(DenyReason::Unauthorized)?;
        self.tokens.parse(token, now).map_err(|e| {
            tracing::debug!(error = %e, "rejected session token");
            DenyReason::Unauthorized
        })
    }

    /// Decides whether `claims` may perform `action`. Only `DeletePost` by a
    /// non-author touches the store.
    pub async fn authorize(
        &self,
        claims: Option<&SessionClaims>,
        action: Action,
    ) -> Result<Decision, DirectoryError> {
        let claims = match (action, claims) {
            (Action::ReadThread | Action::ListPosts, _) => return Ok(Decision::Allowed),
            (_, None) => return Ok(Decision::Denied(DenyReason::Unauthorized)),
            (_, Some(claims)) => claims,
        };

        let decision = match action {
            Action::CreatePost => Decision::Allowed,
            Action::DeletePost { author_id } if author_id == claims.user_id() => Decision::Allowed,
            Action::DeletePost { .. } => {
                if self.directory.has_role(claims.user_id(), ADMIN_ROLE_ID).await? {
                    Decision::Allowed
                } else {
                    Decision::Denied(DenyReason::Forbidden)
                }
            }
            Action::ReadThread | Action::ListPosts => Decision::Allowed,
        };

        if let Decision::Denied(reason) = decision {
            tracing::warn!(user_id = %claims.user_id(), ?action, ?reason, "authorization denied");
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::claims_for;
    use domains::{MockRoleRepository, MockSessionTokens, Role, StorageError, TokenError};

    fn guard_with_live_roles(live: Vec<Role>) -> AuthorizationGuard {
        let mut repo = MockRoleRepository::new();
        repo.expect_roles_for_user().returning(move |_| Ok(live.clone()));
        AuthorizationGuard::new(Arc::new(MockSessionTokens::new()), RoleDirectory::new(Arc::new(repo)))
    }

    fn admin_role() -> Role {
        Role { id: ADMIN_ROLE_ID, name: "admin".into(), privilege_level: 0 }
    }

    #[test]
    fn missing_token_is_unauthorized() {
        let guard = guard_with_live_roles(Vec::new());
        assert_eq!(guard.authenticate(None).unwrap_err(), DenyReason::Unauthorized);
    }

    #[test]
    fn every_parse_failure_collapses_to_unauthorized() {
        for failure in [TokenError::Malformed, TokenError::BadSignature, TokenError::Expired] {
            let mut tokens = MockSessionTokens::new();
            tokens.expect_parse().returning(move |_, _| Err(failure.clone()));
            let guard = AuthorizationGuard::new(
                Arc::new(tokens),
                RoleDirectory::new(Arc::new(MockRoleRepository::new())),
            );
            assert_eq!(guard.authenticate(Some("abc.def.ghi")).unwrap_err(), DenyReason::Unauthorized);
        }
    }

    #[test]
    fn parsed_token_yields_claims() {
        let expected = claims_for(7, vec![]);
        let returned = expected.clone();
        let mut tokens = MockSessionTokens::new();
        tokens.expect_parse().returning(move |_, _| Ok(returned.clone()));
        let guard = AuthorizationGuard::new(
            Arc::new(tokens),
            RoleDirectory::new(Arc::new(MockRoleRepository::new())),
        );
        assert_eq!(guard.authenticate(Some("t")).unwrap(), expected);
    }

    #[tokio::test]
    async fn reads_need_no_identity() {
        let guard = guard_with_live_roles(Vec::new());
        assert_eq!(guard.authorize(None, Action::ReadThread).await.unwrap(), Decision::Allowed);
        assert_eq!(guard.authorize(None, Action::ListPosts).await.unwrap(), Decision::Allowed);
    }

    #[tokio::test]
    async fn create_requires_authentication() {
        let guard = guard_with_live_roles(Vec::new());
        assert_eq!(
            guard.authorize(None, Action::CreatePost).await.unwrap(),
            Decision::Denied(DenyReason::Unauthorized)
        );
        let claims = claims_for(7, vec![]);
        assert!(guard.authorize(Some(&claims), Action::CreatePost).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn author_may_delete_without_a_role_lookup() {
        let mut repo = MockRoleRepository::new();
        repo.expect_roles_for_user().never();
        let guard =
            AuthorizationGuard::new(Arc::new(MockSessionTokens::new()), RoleDirectory::new(Arc::new(repo)));
        let claims = claims_for(7, vec![]);
        let decision = guard
            .authorize(Some(&claims), Action::DeletePost { author_id: UserId(7) })
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allowed);
    }

    #[tokio::test]
    async fn stranger_is_forbidden() {
        let guard = guard_with_live_roles(Vec::new());
        let claims = claims_for(9, vec![]);
        let decision = guard
            .authorize(Some(&claims), Action::DeletePost { author_id: UserId(7) })
            .await
            .unwrap();
        assert_eq!(decision, Decision::Denied(DenyReason::Forbidden));
    }

    #[tokio::test]
    async fn live_admin_may_delete_anything() {
        let guard = guard_with_live_roles(vec![admin_role()]);
        let claims = claims_for(1, vec![]);
        let decision = guard
            .authorize(Some(&claims), Action::DeletePost { author_id: UserId(7) })
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allowed);
    }

    #[tokio::test]
    async fn embedded_admin_role_is_not_trusted() {
        // The token still says admin, the store says otherwise.
        let guard = guard_with_live_roles(Vec::new());
        let claims = claims_for(3, vec![ADMIN_ROLE_ID]);
        let decision = guard
            .authorize(Some(&claims), Action::DeletePost { author_id: UserId(7) })
            .await
            .unwrap();
        assert_eq!(decision, Decision::Denied(DenyReason::Forbidden));
    }

    #[tokio::test]
    async fn directory_outage_is_an_error_not_a_denial() {
        let mut repo = MockRoleRepository::new();
        repo.expect_roles_for_user()
            .returning(|_| Err(StorageError::Unavailable("down".into())));
        let guard =
            AuthorizationGuard::new(Arc::new(MockSessionTokens::new()), RoleDirectory::new(Arc::new(repo)));
        let claims = claims_for(9, vec![]);
        assert!(guard
            .authorize(Some(&claims), Action::DeletePost { author_id: UserId(7) })
            .await
            .is_err());
    }

    #[test]
    fn denials_map_to_error_classes() {
        assert!(matches!(
            Decision::Denied(DenyReason::Unauthorized).into_result(),
            Err(DomainError::AuthenticationFailed)
        ));
        assert!(matches!(
            Decision::Denied(DenyReason::Forbidden).into_result(),
            Err(DomainError::Forbidden)
        ));
        assert!(Decision::Allowed.into_result().is_ok());
    }
}
