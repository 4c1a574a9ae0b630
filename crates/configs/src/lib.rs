//! # configs
//!
//! Layered runtime settings. Later layers win:
//!
//! 1. built-in defaults
//! 2. `config/forum.toml`, if present
//! 3. `FORUM__SECTION__KEY` environment variables
//! 4. the flat `DATABASE_URL`, `JWT_SECRET` and `API_PORT` variables
//!
//! `.env.local` and then `.env` are read into the process environment first;
//! neither overrides a variable that is already set.

use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config/forum.toml";
pub const ENV_PREFIX: &str = "FORUM";
/// HS256 keys shorter than this are refused.
pub const MIN_SECRET_BYTES: usize = 32;
/// One year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 8760;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("`auth.jwt_secret` must be at least {MIN_SECRET_BYTES} bytes")]
    WeakSecret,

    #[error("invalid setting `{0}`: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
    pub errors: ErrorSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(deserialize_with = "secret")]
    pub url: SecretString,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    #[serde(deserialize_with = "secret")]
    pub jwt_secret: SecretString,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorSettings {
    /// Include storage/internal error text in responses. Off in production.
    pub expose_internal: bool,
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Reads `.env.local` then `.env` into the process environment.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
}

impl Settings {
    /// Full load for the server binary: dotenv files, the default config file
    /// and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_sources(Some(DEFAULT_CONFIG_FILE), std::env::vars().collect())
    }

    /// Builds settings from an optional TOML file and an explicit variable map.
    pub fn from_sources(
        file: Option<&str>,
        vars: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("logging.filter", "info,sqlx=warn")?
            .set_default("logging.json", false)?
            .set_default("errors.expose_internal", false)?;

        if let Some(path) = file {
            builder = builder.add_source(File::new(path, FileFormat::Toml).required(false));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .set_override_option("database.url", vars.get("DATABASE_URL").cloned())?
            .set_override_option("auth.jwt_secret", vars.get("JWT_SECRET").cloned())?
            .set_override_option("server.port", vars.get("API_PORT").cloned())?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.expose_secret().trim().is_empty() {
            return Err(ConfigError::Missing("database.url"));
        }
        let secret = self.auth.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ConfigError::Missing("auth.jwt_secret"));
        }
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret);
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(ConfigError::Invalid(
                "auth.token_ttl_hours",
                format!("must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections",
                "must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
