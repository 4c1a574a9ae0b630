use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers;
use crate::middleware::with_standard_layers;
use crate::state::AppState;

/// Builds the full router. The binary mounts it as-is.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/session", get(handlers::session))
        .route("/api/threads/{thread_id}", get(handlers::get_thread))
        .route("/api/threads/{thread_id}/posts", post(handlers::create_post))
        .route("/api/posts/{post_id}", delete(handlers::delete_post))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found);

    with_standard_layers(api).with_state(state)
}
