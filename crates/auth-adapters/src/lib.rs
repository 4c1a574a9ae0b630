//! Credential hashing and session-token adapters.

pub mod argon;
#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use argon::Argon2Hasher;
#[cfg(feature = "auth-jwt")]
pub use jwt::{JwtSessionCodec, DEFAULT_TOKEN_TTL_HOURS};
