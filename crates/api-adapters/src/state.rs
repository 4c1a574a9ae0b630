use std::sync::Arc;

use domains::DomainError;
use services::Services;

use crate::error::ApiError;
use crate::metrics::Metrics;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub metrics: Arc<Metrics>,
    pub expose_internal: bool,
}

impl AppState {
    pub fn new(services: Services, metrics: Arc<Metrics>, expose_internal: bool) -> Self {
        Self { services: Arc::new(services), metrics, expose_internal }
    }

    pub fn reject(&self, error: DomainError) -> ApiError {
        ApiError::new(error, self.expose_internal)
    }
}
