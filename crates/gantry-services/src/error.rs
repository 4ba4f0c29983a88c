//! Container error types

use crate::name::ServiceName;
use thiserror::Error;

/// Container errors
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("service already registered: {0}")]
    DuplicateService(ServiceName),

    #[error("service not found: {0}")]
    ServiceNotFound(ServiceName),

    #[error("parent service is being removed: {0}")]
    ParentRemoved(ServiceName),
}

/// Result type for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Why a service failed to start.
///
/// Carries a message plus an optional underlying cause, preserving the chain
/// for operators reading a failed deployment's report.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StartError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StartError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
