//! # Domain Models
//!
//! Explicit record types for every entity the core touches. Storage adapters map
//! rows into these at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CategoryId, PostId, RoleId, ThreadId, UserId};

/// Full identity record as stored in `users`.
///
/// Not `Serialize`. The password digest must never leave the
/// credential verifier. Use [`UserProfile`] for anything outward-facing.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl User {
    /// Projection with the password digest stripped.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            avatar_url: self.avatar_url.clone(),
            email_verified: self.email_verified,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[redacted]")
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Redacted user projection carried in tokens and author summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named privilege tier. Smaller `privilege_level` means more privilege.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub privilege_level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Thread header joined with its category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub category: Category,
    pub title: String,
    pub author_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub thread_id: ThreadId,
    pub author_id: UserId,
    /// Text as submitted.
    pub content: String,
    /// Escaped HTML produced at creation time.
    pub content_html: String,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub thread_id: ThreadId,
    pub author_id: UserId,
    pub content: String,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
}

/// Author block attached to each post in a thread view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    #[serde(flatten)]
    pub profile: UserProfile,
    /// Display label only; never used for access decisions.
    pub primary_role: Option<RoleId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<AuthorSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadView {
    #[serde(flatten)]
    pub thread: Thread,
    pub posts: Vec<PostView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: UserId(7),
            username: "ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".into(),
            first_name: Some("Ada".into()),
            last_name: None,
            avatar_url: None,
            email_verified: true,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
            login_attempts: 0,
            locked_until: None,
        }
    }

    #[test]
    fn profile_serialization_has_no_digest() {
        let json = serde_json::to_value(sample_user().profile()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("password_hash"));
        assert_eq!(obj["username"], "ada");
    }

    #[test]
    fn debug_output_redacts_digest() {
        let rendered = format!("{:?}", sample_user());
        assert!(!rendered.contains("argon2id"));
        assert!(rendered.contains("[redacted]"));
    }
}
