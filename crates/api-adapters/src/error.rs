//! `DomainError` → HTTP status + JSON envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use domains::DomainError;

const OPAQUE_MESSAGE: &str = "internal error";

/// A failed request. Server-side failures are logged here and rendered opaquely
/// unless `expose_internal` is set.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ApiError {
    error: DomainError,
    expose_internal: bool,
}

impl ApiError {
    pub fn new(error: DomainError, expose_internal: bool) -> Self {
        Self { error, expose_internal }
    }

    fn parts(&self) -> (StatusCode, &'static str, String) {
        match &self.error {
            DomainError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            DomainError::AuthenticationFailed => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.error.to_string())
            }
            DomainError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", "forbidden".into()),
            DomainError::NotFound(..) => {
                (StatusCode::NOT_FOUND, "not_found", self.error.to_string())
            }
            DomainError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", self.internal_message())
            }
            DomainError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", self.internal_message())
            }
        }
    }

    fn internal_message(&self) -> String {
        if self.expose_internal {
            self.error.to_string()
        } else {
            OPAQUE_MESSAGE.to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self.error, code, "request failed");
        }
        json_error(status, code, message)
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
