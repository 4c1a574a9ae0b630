//! # api-adapters
//!
//! HTTP surface of the forum core. Handlers translate requests into service
//! calls and map `DomainError` onto the JSON envelope; they hold no business
//! rules of their own.

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod routes;
#[cfg(feature = "web-axum")]
pub mod state;

pub use metrics::Metrics;

#[cfg(feature = "web-axum")]
pub use routes::router;
#[cfg(feature = "web-axum")]
pub use state::AppState;
