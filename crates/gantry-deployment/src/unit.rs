//! Deployment units

use std::fmt;

use gantry_attachments::{Attachable, AttachmentStore};
use gantry_services::{ServiceName, ServiceRegistry};

/// One deployment, or sub-deployment, moving through the phase pipeline.
///
/// The unit itself is passive state: identity plus the attachment store that
/// processors read and write across phases. Lifecycle belongs to the unit's
/// services; the registry arena owns the unit for as long as its bootstrap
/// service is up.
pub struct DeploymentUnit {
    name: String,
    service_name: ServiceName,
    parent_name: Option<ServiceName>,
    attachments: AttachmentStore,
    registry: ServiceRegistry,
}

impl DeploymentUnit {
    pub(crate) fn new(
        name: impl Into<String>,
        service_name: ServiceName,
        parent_name: Option<ServiceName>,
        registry: ServiceRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            service_name,
            parent_name,
            attachments: AttachmentStore::new(),
            registry,
        }
    }

    /// The simple name, e.g. `shop.war`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit's own service name: `unit/<name>`, or
    /// `subunit/<parent>/<name>` for sub-deployments.
    pub fn service_name(&self) -> &ServiceName {
        &self.service_name
    }

    /// Service name of the parent unit, when this is a sub-deployment.
    pub fn parent_name(&self) -> Option<&ServiceName> {
        self.parent_name.as_ref()
    }

    pub fn is_sub_deployment(&self) -> bool {
        self.parent_name.is_some()
    }

    /// Read-only view of the container the unit's services live in.
    pub fn service_registry(&self) -> &ServiceRegistry {
        &self.registry
    }
}

impl Attachable for DeploymentUnit {
    fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }
}

impl fmt::Display for DeploymentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent_name {
            Some(parent) => write!(f, "subdeployment \"{}\" of {}", self.name, parent),
            None => write!(f, "deployment \"{}\"", self.name),
        }
    }
}

impl fmt::Debug for DeploymentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentUnit")
            .field("name", &self.name)
            .field("service_name", &self.service_name)
            .field("parent_name", &self.parent_name)
            .finish()
    }
}
