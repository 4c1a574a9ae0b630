//! Shared fixture for the cross-crate tests: a fully wired forum over the
//! in-memory store, with a real argon2 hasher (minimum cost) and JWT codec.

use std::sync::Arc;

use chrono::Utc;

use auth_adapters::{Argon2Hasher, JwtSessionCodec};
use domains::{
    Category, CategoryId, CredentialHasher, Role, RoleId, SessionClaims, SessionTokens, Thread,
    ThreadId, User, UserId, ADMIN_ROLE_ID,
};
use services::{Ports, Services};
use storage_adapters::MemoryStore;

pub const SECRET: &[u8] = b"integration-secret-integration-secret";
pub const PASSWORD: &str = "correct horse battery";
pub const MEMBER_ROLE_ID: RoleId = RoleId(3);
pub const MODERATOR_ROLE_ID: RoleId = RoleId(2);
pub const WELCOME_THREAD: ThreadId = ThreadId(42);

pub struct Forum {
    pub store: Arc<MemoryStore>,
    pub codec: Arc<JwtSessionCodec>,
    pub hasher: Arc<Argon2Hasher>,
    pub services: Arc<Services>,
}

impl Forum {
    pub fn new() -> Self {
        Self::with_pool_size(storage_adapters::memory::DEFAULT_POOL_SIZE)
    }

    /// Roles 1 (admin), 2 (moderator) and 3 (member), category 1, thread 42.
    pub fn with_pool_size(size: usize) -> Self {
        let store = Arc::new(MemoryStore::with_pool_size(size));
        let codec = Arc::new(JwtSessionCodec::new(SECRET));
        let hasher = Arc::new(Argon2Hasher::with_cost(8, 1, 1).expect("valid argon2 cost"));

        store.add_role(Role { id: ADMIN_ROLE_ID, name: "admin".into(), privilege_level: 0 });
        store.add_role(Role { id: MODERATOR_ROLE_ID, name: "moderator".into(), privilege_level: 10 });
        store.add_role(Role { id: MEMBER_ROLE_ID, name: "member".into(), privilege_level: 20 });

        let now = Utc::now();
        store.add_thread(Thread {
            id: WELCOME_THREAD,
            category: Category { id: CategoryId(1), name: "General".into() },
            title: "Welcome".into(),
            author_id: None,
            created_at: now,
            updated_at: now,
        });

        let services = Services::new(Ports {
            users: store.clone(),
            roles: store.clone(),
            threads: store.clone(),
            posts: store.clone(),
            hasher: hasher.clone(),
            tokens: codec.clone(),
        });

        Self { store, codec, hasher, services: Arc::new(services) }
    }

    /// Registers an active user whose password is [`PASSWORD`].
    pub fn add_user(&self, id: i64, username: &str, roles: &[RoleId]) -> UserId {
        let now = Utc::now();
        let digest = self.hasher.hash(PASSWORD).expect("hashing succeeds");
        self.store.add_user(User {
            id: UserId(id),
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: digest,
            first_name: None,
            last_name: None,
            avatar_url: None,
            email_verified: true,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
            login_attempts: 0,
            locked_until: None,
        });
        for role in roles {
            self.store.assign_role(UserId(id), *role);
        }
        UserId(id)
    }

    /// Logs in through the real flow and decodes the returned token.
    pub async fn login(&self, username: &str) -> (String, SessionClaims) {
        let outcome = self
            .services
            .sessions
            .login(username, PASSWORD)
            .await
            .expect("login succeeds");
        let claims = self.codec.parse(&outcome.token, Utc::now()).expect("token parses");
        (outcome.token, claims)
    }

    #[cfg(feature = "web-axum")]
    pub fn router(&self, expose_internal: bool) -> axum::Router {
        use api_adapters::{AppState, Metrics};

        let state = AppState {
            services: Arc::clone(&self.services),
            metrics: Arc::new(Metrics::new()),
            expose_internal,
        };
        api_adapters::router(state)
    }
}

impl Default for Forum {
    fn default() -> Self {
        Self::new()
    }
}
