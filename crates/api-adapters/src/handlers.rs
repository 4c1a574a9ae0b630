//! # Handlers
//!
//! Each handler extracts its input, calls exactly one service operation and
//! wraps the result in the `{success, data}` envelope.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use domains::{DomainError, PostId, SessionClaims, ThreadId};

use crate::error::{json_error, ApiError};
use crate::metrics::Operation;
use crate::middleware::bearer_token;
use crate::state::AppState;

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

fn respond<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(Envelope { success: true, data })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

fn invalid_body(state: &AppState, rejection: JsonRejection) -> ApiError {
    state.reject(DomainError::Validation(rejection.body_text()))
}

fn invalid_path(state: &AppState, rejection: PathRejection) -> ApiError {
    state.reject(DomainError::Validation(rejection.body_text()))
}

/// Absent header: `None`. Present but unusable token: rejected outright.
fn session_claims(state: &AppState, headers: &HeaderMap) -> Result<Option<SessionClaims>, ApiError> {
    match bearer_token(headers) {
        None => Ok(None),
        Some(token) => state
            .services
            .guard
            .authenticate(Some(token))
            .map(Some)
            .map_err(|reason| state.reject(reason.into())),
    }
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|r| invalid_body(&state, r))?;

    let result = state.services.sessions.login(&request.identifier, &request.password).await;
    state.metrics.record_login(&result);

    let outcome = result.map_err(|e| state.reject(e))?;
    Ok(respond(StatusCode::OK, outcome))
}

pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let claims = session_claims(&state, &headers)?
        .ok_or_else(|| state.reject(DomainError::AuthenticationFailed))?;
    Ok(respond(StatusCode::OK, claims))
}

pub async fn get_thread(
    State(state): State<AppState>,
    thread_id: Result<Path<ThreadId>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(thread_id) = thread_id.map_err(|r| invalid_path(&state, r))?;

    let result = state.services.content.get_thread(thread_id).await;
    state.metrics.record_operation(Operation::ReadThread, &result);

    let view = result.map_err(|e| state.reject(e))?;
    Ok(respond(StatusCode::OK, view))
}

pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    thread_id: Result<Path<ThreadId>, PathRejection>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(thread_id) = thread_id.map_err(|r| invalid_path(&state, r))?;
    // No identity means 401 whatever the body looks like.
    let Some(claims) = session_claims(&state, &headers)? else {
        let result: Result<(), _> = Err(DomainError::AuthenticationFailed);
        state.metrics.record_operation(Operation::CreatePost, &result);
        return Err(state.reject(DomainError::AuthenticationFailed));
    };
    let Json(request) = payload.map_err(|r| invalid_body(&state, r))?;

    let result = state
        .services
        .mutations
        .create_post(Some(&claims), thread_id, &request.content)
        .await;
    state.metrics.record_operation(Operation::CreatePost, &result);

    let post = result.map_err(|e| state.reject(e))?;
    Ok(respond(StatusCode::CREATED, post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    post_id: Result<Path<PostId>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(post_id) = post_id.map_err(|r| invalid_path(&state, r))?;
    let claims = session_claims(&state, &headers)?;

    let result = state.services.mutations.delete_post(claims.as_ref(), post_id).await;
    state.metrics.record_operation(Operation::DeletePost, &result);

    let deleted = result.map_err(|e| state.reject(e))?;
    Ok(respond(StatusCode::OK, DeleteResponse { deleted }))
}

pub async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "metrics unavailable")
        }
    }
}

pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "route not found")
}
