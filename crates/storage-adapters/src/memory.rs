//! # In-memory store
//!
//! Implements every storage port over `DashMap` tables. Each operation holds a
//! lease on a bounded connection budget for its whole duration, the same way a
//! pooled database connection would be held, and the lease is returned on every
//! exit path. Acquire/release counters make leaks observable in tests, and the
//! store can be switched "offline" to inject storage faults.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Semaphore, SemaphorePermit};

use domains::{
    NewPost, Post, PostId, PostRepository, Role, RoleId, RoleRepository,
    StorageError, Thread, ThreadId, ThreadRepository, User, UserId, UserRepository,
};

/// Matches the default `database.max_connections`.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Snapshot of the connection budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub size: usize,
    pub available: usize,
    pub acquired: u64,
    pub released: u64,
}

impl PoolStats {
    pub fn in_use(&self) -> u64 {
        self.acquired - self.released
    }
}

pub struct MemoryStore {
    users: DashMap<UserId, User>,
    roles: DashMap<RoleId, Role>,
    assignments: DashMap<UserId, BTreeSet<RoleId>>,
    threads: DashMap<ThreadId, Thread>,
    posts: DashMap<PostId, Post>,
    next_post_id: AtomicI64,

    pool: Semaphore,
    size: usize,
    acquired: AtomicU64,
    released: AtomicU64,
    offline: AtomicBool,
}

/// One borrowed "connection". Dropping it gives the slot back.
struct Lease<'a> {
    _permit: SemaphorePermit<'a>,
    released: &'a AtomicU64,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_pool_size(DEFAULT_POOL_SIZE)
    }

    pub fn with_pool_size(size: usize) -> Self {
        Self {
            users: DashMap::new(),
            roles: DashMap::new(),
            assignments: DashMap::new(),
            threads: DashMap::new(),
            posts: DashMap::new(),
            next_post_id: AtomicI64::new(1),
            pool: Semaphore::new(size),
            size,
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
            offline: AtomicBool::new(false),
        }
    }

    /// While offline every operation fails with `StorageError::Unavailable`
    /// after acquiring its lease.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.size,
            available: self.pool.available_permits(),
            acquired: self.acquired.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
        }
    }

    async fn lease(&self) -> Result<Lease<'_>, StorageError> {
        let permit = self
            .pool
            .acquire()
            .await
            .map_err(|_| StorageError::Unavailable("connection pool closed".into()))?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let lease = Lease { _permit: permit, released: &self.released };

        // Let other tasks run while the slot is held.
        tokio::task::yield_now().await;

        if self.offline.load(Ordering::SeqCst) {
            tracing::debug!("memory store offline, failing operation");
            return Err(StorageError::Unavailable("store offline".into()));
        }
        Ok(lease)
    }

    // --- seeding -------------------------------------------------------------

    pub fn add_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn add_role(&self, role: Role) {
        self.roles.insert(role.id, role);
    }

    pub fn assign_role(&self, user_id: UserId, role_id: RoleId) {
        self.assignments.entry(user_id).or_default().insert(role_id);
    }

    pub fn revoke_role(&self, user_id: UserId, role_id: RoleId) {
        if let Some(mut set) = self.assignments.get_mut(&user_id) {
            set.remove(&role_id);
        }
    }

    /// Threads carry their category inline.
    pub fn add_thread(&self, thread: Thread) {
        self.threads.insert(thread.id, thread);
    }

    /// Inserts a post with a caller-chosen id; later inserts continue after it.
    pub fn add_post(&self, post: Post) {
        self.next_post_id.fetch_max(post.id.get() + 1, Ordering::SeqCst);
        self.posts.insert(post.id, post);
    }

    /// Direct read, bypassing the lease accounting.
    pub fn user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    /// Direct read, bypassing the lease accounting.
    pub fn post(&self, id: PostId) -> Option<Post> {
        self.posts.get(&id).map(|p| p.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StorageError> {
        let _lease = self.lease().await?;
        Ok(self
            .users
            .iter()
            .find(|u| u.username == identifier || u.email == identifier)
            .map(|u| u.clone()))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let _lease = self.lease().await?;
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StorageError> {
        let _lease = self.lease().await?;
        if let Some(mut user) = self.users.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn roles_for_user(&self, user_id: UserId) -> Result<Vec<Role>, StorageError> {
        let _lease = self.lease().await?;
        let ids: Vec<RoleId> = self
            .assignments
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.roles.get(&id).map(|r| r.clone()))
            .collect())
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn find_thread(&self, id: ThreadId) -> Result<Option<Thread>, StorageError> {
        let _lease = self.lease().await?;
        Ok(self.threads.get(&id).map(|t| t.clone()))
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, post: NewPost) -> Result<PostId, StorageError> {
        let _lease = self.lease().await?;
        let id = PostId(self.next_post_id.fetch_add(1, Ordering::SeqCst));
        self.posts.insert(
            id,
            Post {
                id,
                thread_id: post.thread_id,
                author_id: post.author_id,
                content: post.content,
                content_html: post.content_html,
                created_at: post.created_at,
                is_deleted: false,
            },
        );
        Ok(id)
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, StorageError> {
        let _lease = self.lease().await?;
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn live_posts_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Post>, StorageError> {
        let _lease = self.lease().await?;
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.thread_id == thread_id && !p.is_deleted)
            .map(|p| p.clone())
            .collect();
        posts.sort_by_key(|p| (p.created_at, p.id));
        Ok(posts)
    }

    async fn soft_delete_post(&self, id: PostId) -> Result<u64, StorageError> {
        let _lease = self.lease().await?;
        match self.posts.get_mut(&id) {
            Some(mut post) if !post.is_deleted => {
                post.is_deleted = true;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use domains::{Category, CategoryId};

    fn user(id: i64, username: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId(id),
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: "digest".into(),
            first_name: None,
            last_name: None,
            avatar_url: None,
            email_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
            login_attempts: 0,
            locked_until: None,
        }
    }

    fn thread(id: i64) -> Thread {
        let now = Utc::now();
        Thread {
            id: ThreadId(id),
            category: Category { id: CategoryId(1), name: "General".into() },
            title: "hello".into(),
            author_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn new_post(thread_id: i64, author: i64, content: &str) -> NewPost {
        NewPost {
            thread_id: ThreadId(thread_id),
            author_id: UserId(author),
            content: content.into(),
            content_html: content.into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn identifier_matches_username_or_email() {
        let store = MemoryStore::new();
        store.add_user(user(1, "ada"));

        assert!(store.find_by_identifier("ada").await.unwrap().is_some());
        assert!(store.find_by_identifier("ada@example.com").await.unwrap().is_some());
        assert!(store.find_by_identifier("Ada").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn roles_follow_assignments_live() {
        let store = MemoryStore::new();
        store.add_role(Role { id: RoleId(1), name: "admin".into(), privilege_level: 0 });
        store.add_role(Role { id: RoleId(3), name: "member".into(), privilege_level: 20 });
        store.assign_role(UserId(5), RoleId(1));
        store.assign_role(UserId(5), RoleId(3));
        assert_eq!(store.roles_for_user(UserId(5)).await.unwrap().len(), 2);

        store.revoke_role(UserId(5), RoleId(1));
        let roles = store.roles_for_user(UserId(5)).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, RoleId(3));
    }

    #[tokio::test]
    async fn soft_delete_hides_post_and_is_idempotent() {
        let store = MemoryStore::new();
        store.add_thread(thread(42));
        let first = store.insert_post(new_post(42, 1, "one")).await.unwrap();
        let second = store.insert_post(new_post(42, 1, "two")).await.unwrap();

        assert_eq!(store.soft_delete_post(first).await.unwrap(), 1);
        assert_eq!(store.soft_delete_post(first).await.unwrap(), 0);
        assert_eq!(store.soft_delete_post(PostId(999)).await.unwrap(), 0);

        let live = store.live_posts_for_thread(ThreadId(42)).await.unwrap();
        assert_eq!(live.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second]);
        assert!(store.find_post(first).await.unwrap().unwrap().is_deleted);
    }

    #[tokio::test]
    async fn seeded_ids_are_not_reused() {
        let store = MemoryStore::new();
        store.add_post(Post {
            id: PostId(10),
            thread_id: ThreadId(1),
            author_id: UserId(1),
            content: "seed".into(),
            content_html: "seed".into(),
            created_at: Utc::now(),
            is_deleted: false,
        });
        let id = store.insert_post(new_post(1, 1, "next")).await.unwrap();
        assert_eq!(id, PostId(11));
    }

    #[tokio::test]
    async fn record_login_stamps_the_user() {
        let store = MemoryStore::new();
        store.add_user(user(1, "ada"));
        let at = Utc::now();
        store.record_login(UserId(1), at).await.unwrap();
        assert_eq!(store.user(UserId(1)).unwrap().last_login, Some(at));
    }

    #[tokio::test]
    async fn offline_operations_fail_and_release_their_lease() {
        let store = MemoryStore::with_pool_size(2);
        store.set_offline(true);

        let err = store.find_thread(ThreadId(1)).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));

        let stats = store.stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.in_use(), 0);
        assert_eq!(stats.available, 2);
    }

    #[tokio::test]
    async fn concurrent_operations_never_exceed_the_budget() {
        let store = Arc::new(MemoryStore::with_pool_size(3));
        store.add_thread(thread(1));

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        store.insert_post(new_post(1, 1, "x")).await.map(|_| ())
                    } else {
                        store.live_posts_for_thread(ThreadId(1)).await.map(|_| ())
                    }
                })
            })
            .collect();
        for handle in handles {
            tokio_test::assert_ok!(handle.await.unwrap());
        }

        let stats = store.stats();
        assert_eq!(stats.acquired, 50);
        assert_eq!(stats.released, 50);
        assert_eq!(stats.available, 3);
    }
}
