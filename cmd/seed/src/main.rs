//! Seeds reference roles, a default category and an administrator account.
//!
//! Reads `DATABASE_URL`, `SEED_ADMIN_PASSWORD` and optionally
//! `SEED_ADMIN_USERNAME` / `SEED_ADMIN_EMAIL`. Safe to run repeatedly.

use std::time::Duration;

use anyhow::{bail, Context};

use auth_adapters::Argon2Hasher;
use domains::{CredentialHasher, ADMIN_ROLE_ID};
use storage_adapters::PgStore;

const ROLES: &[(i64, &str, i32)] = &[
    (1, "admin", 0),
    (2, "moderator", 10),
    (3, "member", 20),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    configs::load_dotenv();

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let password = std::env::var("SEED_ADMIN_PASSWORD").context("SEED_ADMIN_PASSWORD is not set")?;
    if password.len() < 8 {
        bail!("SEED_ADMIN_PASSWORD must be at least 8 characters");
    }
    let username = std::env::var("SEED_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    let email = std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@localhost".into());

    let store = PgStore::connect(&url, 2, Duration::from_secs(10)).await?;
    store.migrate().await?;
    let pool = store.pool();

    for (id, name, level) in ROLES {
        sqlx::query(
            "INSERT INTO user_roles (id, name, privilege_level) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(*id)
        .bind(*name)
        .bind(*level)
        .execute(pool)
        .await?;
    }
    println!("roles ok");

    let digest = Argon2Hasher::new()?.hash(&password)?;
    sqlx::query(
        "INSERT INTO users (username, email, password_hash, email_verified, is_active) \
         VALUES ($1, $2, $3, TRUE, TRUE) ON CONFLICT (username) DO NOTHING",
    )
    .bind(&username)
    .bind(&email)
    .bind(&digest)
    .execute(pool)
    .await?;

    let admin_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(&username)
        .fetch_one(pool)
        .await?;
    sqlx::query(
        "INSERT INTO user_role_assignments (user_id, role_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(admin_id)
    .bind(ADMIN_ROLE_ID.get())
    .execute(pool)
    .await?;
    println!("admin `{username}` ok (id {admin_id})");

    let category_id: i64 = match sqlx::query_scalar::<_, i64>(
        "SELECT id FROM forum_categories WHERE name = 'General'",
    )
    .fetch_optional(pool)
    .await?
    {
        Some(id) => id,
        None => {
            sqlx::query_scalar("INSERT INTO forum_categories (name) VALUES ('General') RETURNING id")
                .fetch_one(pool)
                .await?
        }
    };

    let has_thread: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM forum_threads WHERE category_id = $1)")
            .bind(category_id)
            .fetch_one(pool)
            .await?;
    if !has_thread {
        sqlx::query(
            "INSERT INTO forum_threads (category_id, title, author_id) VALUES ($1, 'Welcome', $2)",
        )
        .bind(category_id)
        .bind(admin_id)
        .execute(pool)
        .await?;
    }
    println!("category `General` ok (id {category_id})");

    println!("seed complete");
    Ok(())
}
