//! # Role Directory
//!
//! Resolves a user's role assignments from the store on every call. Nothing is
//! cached: a demotion takes effect on the next lookup.

use std::sync::Arc;

use domains::{DirectoryError, Role, RoleId, RoleRepository, UserId};

#[derive(Clone)]
pub struct RoleDirectory {
    roles: Arc<dyn RoleRepository>,
}

impl RoleDirectory {
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self { roles }
    }

    /// Role ids ordered most-privileged first. Ties fall back to role id so the
    /// order is stable across calls.
    pub async fn resolve_roles(&self, user_id: UserId) -> Result<Vec<RoleId>, DirectoryError> {
        let mut roles: Vec<Role> = self.roles.roles_for_user(user_id).await?;
        roles.sort_by_key(|r| (r.privilege_level, r.id));
        roles.dedup_by_key(|r| r.id);
        Ok(roles.into_iter().map(|r| r.id).collect())
    }

    /// Display label source. Not an access-control input.
    pub async fn primary_role(&self, user_id: UserId) -> Result<Option<RoleId>, DirectoryError> {
        Ok(self.resolve_roles(user_id).await?.into_iter().next())
    }

    /// Membership test against the live assignment set, independent of ordering.
    pub async fn has_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool, DirectoryError> {
        let roles = self.roles.roles_for_user(user_id).await?;
        Ok(roles.iter().any(|r| r.id == role_id))
    }
}
