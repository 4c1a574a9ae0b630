//! # domains
//!
//! Entities, error taxonomy and port traits for the forum access-control core.
//! Nothing in this crate performs I/O; adapters implement the ports.

pub mod error;
pub mod ids;
pub mod models;
pub mod ports;
pub mod session;

pub use error::*;
pub use ids::*;
pub use models::*;
pub use ports::*;
pub use session::*;

/// Role id of the administrator tier in the reference data.
pub const ADMIN_ROLE_ID: RoleId = RoleId(1);

/// Longest accepted post body, in characters.
pub const MAX_POST_LENGTH: usize = 10_000;
