//! Deployment errors

use thiserror::Error;

use gantry_content::{ContentError, ContentHash};
use gantry_services::{ContainerError, ServiceName};

use crate::chain::Priority;
use crate::phase::Phase;

/// A processor's failure to deploy or undeploy one unit.
///
/// Carries a message and an optional cause; the phase engine wraps it with
/// the failing phase and unit when it surfaces the failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DeploymentUnitProcessingError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DeploymentUnitProcessingError {
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

#[derive(Debug, Error)]
pub enum DeployerError {
    #[error("no deployment content available for hash {0}")]
    MissingContent(ContentHash),

    #[error("deployment {0:?} already exists")]
    DuplicateDeployment(String),

    #[error("no deployment named {0:?}")]
    UnknownDeployment(String),

    #[error("deployment failed in service {service}: {message}")]
    DeploymentFailed {
        service: ServiceName,
        message: String,
    },

    #[error(
        "multiple processors registered with priority {priority} and name {name:?} in phase {phase}"
    )]
    DuplicateProcessor {
        phase: Phase,
        priority: Priority,
        name: String,
    },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

pub type Result<T> = std::result::Result<T, DeployerError>;
