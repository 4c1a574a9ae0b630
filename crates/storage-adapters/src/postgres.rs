//! # Postgres store
//!
//! Maps between the relational layout in `migrations/` and the domain records.
//! Each port method runs one query on a pooled connection; `sqlx` returns the
//! connection to the pool when the call completes or fails.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};

use domains::{
    Category, CategoryId, NewPost, Post, PostId, PostRepository, Role, RoleId, RoleRepository,
    StorageError, Thread, ThreadId, ThreadRepository, User, UserId, UserRepository,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

fn unavailable(err: sqlx::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

fn decode(err: sqlx::Error) -> StorageError {
    StorageError::Decode(err.to_string())
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a bounded pool. Callers waiting longer than `acquire_timeout` for a
    /// free connection get `StorageError::Unavailable`.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(unavailable)?;
        Ok(Self::new(pool))
    }

    /// Applies any pending schema migrations.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Unavailable(format!("migration failed: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     avatar_url, email_verified, is_active, created_at, updated_at, last_login, \
     login_attempts, locked_until";

const POST_COLUMNS: &str =
    "id, thread_id, author_id, content, content_html, created_at, is_deleted";

fn user_from_row(row: &PgRow) -> Result<User, StorageError> {
    Ok(User {
        id: UserId(row.try_get("id").map_err(decode)?),
        username: row.try_get("username").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        first_name: row.try_get("first_name").map_err(decode)?,
        last_name: row.try_get("last_name").map_err(decode)?,
        avatar_url: row.try_get("avatar_url").map_err(decode)?,
        email_verified: row.try_get("email_verified").map_err(decode)?,
        is_active: row.try_get("is_active").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
        last_login: row.try_get("last_login").map_err(decode)?,
        login_attempts: row.try_get("login_attempts").map_err(decode)?,
        locked_until: row.try_get("locked_until").map_err(decode)?,
    })
}

fn post_from_row(row: &PgRow) -> Result<Post, StorageError> {
    Ok(Post {
        id: PostId(row.try_get("id").map_err(decode)?),
        thread_id: ThreadId(row.try_get("thread_id").map_err(decode)?),
        author_id: UserId(row.try_get("author_id").map_err(decode)?),
        content: row.try_get("content").map_err(decode)?,
        content_html: row.try_get("content_html").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        is_deleted: row.try_get("is_deleted").map_err(decode)?,
    })
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id.get())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for PgStore {
    async fn roles_for_user(&self, user_id: UserId) -> Result<Vec<Role>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.name, r.privilege_level
            FROM user_role_assignments a
            JOIN user_roles r ON r.id = a.role_id
            WHERE a.user_id = $1
            "#,
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.iter()
            .map(|row| {
                Ok(Role {
                    id: RoleId(row.try_get("id").map_err(decode)?),
                    name: row.try_get("name").map_err(decode)?,
                    privilege_level: row.try_get("privilege_level").map_err(decode)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ThreadRepository for PgStore {
    async fn find_thread(&self, id: ThreadId) -> Result<Option<Thread>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT t.id, t.title, t.author_id, t.created_at, t.updated_at,
                   c.id AS category_id, c.name AS category_name
            FROM forum_threads t
            JOIN forum_categories c ON c.id = t.category_id
            WHERE t.id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Thread {
            id: ThreadId(row.try_get("id").map_err(decode)?),
            category: Category {
                id: CategoryId(row.try_get("category_id").map_err(decode)?),
                name: row.try_get("category_name").map_err(decode)?,
            },
            title: row.try_get("title").map_err(decode)?,
            author_id: row.try_get::<Option<i64>, _>("author_id").map_err(decode)?.map(UserId),
            created_at: row.try_get("created_at").map_err(decode)?,
            updated_at: row.try_get("updated_at").map_err(decode)?,
        }))
    }
}

#[async_trait]
impl PostRepository for PgStore {
    async fn insert_post(&self, post: NewPost) -> Result<PostId, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO forum_posts (thread_id, author_id, content, content_html, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(post.thread_id.get())
        .bind(post.author_id.get())
        .bind(post.content)
        .bind(post.content_html)
        .bind(post.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(PostId(row.try_get("id").map_err(decode)?))
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, StorageError> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM forum_posts WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.as_ref().map(post_from_row).transpose()
    }

    async fn live_posts_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Post>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM forum_posts \
             WHERE thread_id = $1 AND is_deleted = FALSE \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(thread_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.iter().map(post_from_row).collect()
    }

    async fn soft_delete_post(&self, id: PostId) -> Result<u64, StorageError> {
        let result = sqlx::query(
            "UPDATE forum_posts SET is_deleted = TRUE WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected())
    }
}
