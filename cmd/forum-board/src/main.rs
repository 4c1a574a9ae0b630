//! # forum-board
//!
//! Server entry point. Loads settings, opens the connection pool, wires the
//! adapters into the core and serves the HTTP API until interrupted.

#[cfg(not(all(feature = "web-axum", feature = "db-postgres", feature = "auth-jwt")))]
compile_error!("forum-board needs the web-axum, db-postgres and auth-jwt features");

use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use api_adapters::{router, AppState, Metrics};
use auth_adapters::{Argon2Hasher, JwtSessionCodec};
use configs::{LoggingSettings, Settings};
use services::{Ports, Services};
use storage_adapters::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.logging).context("failed to initialise tracing")?;

    let store = PgStore::connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
        settings.database.acquire_timeout(),
    )
    .await
    .context("failed to connect to postgres")?;
    store.migrate().await.context("failed to run migrations")?;
    let store = Arc::new(store);

    let hasher = Arc::new(Argon2Hasher::new()?);
    let tokens = Arc::new(JwtSessionCodec::with_ttl_hours(
        settings.auth.jwt_secret.expose_secret().as_bytes(),
        settings.auth.token_ttl_hours,
    )?);

    let services = Services::new(Ports {
        users: store.clone(),
        roles: store.clone(),
        threads: store.clone(),
        posts: store,
        hasher,
        tokens,
    });
    // Pay for the unknown-user digest before the first login does.
    services.sessions.verifier().prepare()?;

    let state = AppState::new(services, Arc::new(Metrics::new()), settings.errors.expose_internal);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", settings.server.bind_addr()))?;
    tracing::info!(addr = %listener.local_addr()?, "forum-board listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("forum-board stopped");
    Ok(())
}

/// `RUST_LOG` wins over `logging.filter` when set.
fn init_tracing(logging: &LoggingSettings) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };
    installed.map_err(|e| anyhow::anyhow!(e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("shutdown requested");
}
