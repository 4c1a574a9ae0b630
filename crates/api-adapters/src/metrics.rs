//! Prometheus counters for logins and forum operations.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

use domains::DomainError;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum LoginResult {
    Success,
    Rejected,
    Error,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct LoginLabels {
    pub result: LoginResult,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Operation {
    ReadThread,
    CreatePost,
    DeletePost,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Outcome {
    Ok,
    Invalid,
    Unauthorized,
    Forbidden,
    NotFound,
    Failed,
}

impl Outcome {
    pub fn of<T>(result: &Result<T, DomainError>) -> Self {
        match result {
            Ok(_) => Outcome::Ok,
            Err(DomainError::Validation(_)) => Outcome::Invalid,
            Err(DomainError::AuthenticationFailed) => Outcome::Unauthorized,
            Err(DomainError::Forbidden) => Outcome::Forbidden,
            Err(DomainError::NotFound(..)) => Outcome::NotFound,
            Err(DomainError::Storage(_) | DomainError::Internal(_)) => Outcome::Failed,
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OperationLabels {
    pub operation: Operation,
    pub outcome: Outcome,
}

pub struct Metrics {
    registry: Registry,
    logins: Family<LoginLabels, Counter>,
    operations: Family<OperationLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("forum");
        let logins = Family::<LoginLabels, Counter>::default();
        let operations = Family::<OperationLabels, Counter>::default();
        registry.register("logins", "Login attempts by result", logins.clone());
        registry.register("operations", "Forum operations by outcome", operations.clone());
        Self { registry, logins, operations }
    }

    pub fn record_login<T>(&self, result: &Result<T, DomainError>) {
        let result = match result {
            Ok(_) => LoginResult::Success,
            Err(DomainError::AuthenticationFailed | DomainError::Validation(_)) => {
                LoginResult::Rejected
            }
            Err(_) => LoginResult::Error,
        };
        self.logins.get_or_create(&LoginLabels { result }).inc();
    }

    pub fn record_operation<T>(&self, operation: Operation, result: &Result<T, DomainError>) {
        self.operations
            .get_or_create(&OperationLabels { operation, outcome: Outcome::of(result) })
            .inc();
    }

    /// OpenMetrics text exposition.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}
