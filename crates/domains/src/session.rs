use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{RoleId, UserId, UserProfile};

/// Decoded token payload.
///
/// `roles` is a snapshot taken at issuance and is for display only. Anything
/// destructive must re-resolve roles from the role directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub roles: Vec<RoleId>,
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> UserId {
        self.profile.id
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// A freshly signed token and the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
