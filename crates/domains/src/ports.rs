//! # Ports
//!
//! Any adapter must implement these traits to be wired into the services. Every
//! storage method is one logical operation: the adapter acquires a connection,
//! runs it and releases the connection on every exit path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    HashError, IssuedToken, NewPost, Post, PostId, Role, RoleId, SessionClaims, StorageError,
    Thread, ThreadId, TokenError, User, UserId, UserProfile,
};

/// Read access to `users`, plus login bookkeeping.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Exact match on username OR email.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StorageError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Stamps `last_login`. Lockout counters are left untouched.
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StorageError>;
}

/// Role assignments joined with role reference data.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Every role assigned to the user, in no particular order.
    async fn roles_for_user(&self, user_id: UserId) -> Result<Vec<Role>, StorageError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Thread joined with its category, or `None`.
    async fn find_thread(&self, id: ThreadId) -> Result<Option<Thread>, StorageError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert_post(&self, post: NewPost) -> Result<PostId, StorageError>;

    /// Loads a post whether or not it has been soft-deleted.
    async fn find_post(&self, id: PostId) -> Result<Option<Post>, StorageError>;

    /// Non-deleted posts of a thread, oldest first.
    async fn live_posts_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Post>, StorageError>;

    /// Flips `is_deleted` where it is still false. Returns rows affected (0 or 1).
    async fn soft_delete_post(&self, id: PostId) -> Result<u64, StorageError>;
}

/// Salted, iterated one-way password hashing.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    /// Produces a self-describing digest with an embedded salt.
    fn hash(&self, plain: &str) -> Result<String, HashError>;

    /// Constant-time comparison. A digest that cannot be parsed never matches.
    fn verify(&self, plain: &str, digest: &str) -> bool;
}

/// Signed, time-bounded session tokens. Pure: no storage, no clock reads.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SessionTokens: Send + Sync {
    fn issue(
        &self,
        profile: &UserProfile,
        roles: &[RoleId],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError>;

    fn parse(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}
