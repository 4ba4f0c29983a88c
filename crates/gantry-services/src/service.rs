//! The service contract

use crate::container::{ServiceContainer, ServiceTarget};
use crate::error::StartError;
use crate::name::ServiceName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// The type-erased value a service exposes to its dependents while up.
pub type ServiceValue = Arc<dyn Any + Send + Sync>;

/// Lifecycle states tracked per installed service. A removed service has no
/// state; lookups for it return nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    Down,
    Starting,
    Up,
    StartFailed,
    Stopping,
}

/// A unit of runtime work managed by the container.
///
/// `start` and `stop` are never invoked concurrently on one instance; the
/// container serializes each service's transitions while running unrelated
/// services in parallel.
#[async_trait]
pub trait Service: Send + Sync {
    /// Bring the service up. Dependencies are up and injected before this is
    /// called. Returning an error parks the service in the failed state and
    /// removes anything installed through the start context's child target.
    async fn start(&self, ctx: &StartContext) -> Result<(), StartError>;

    /// Bring the service down. Dependents are already down when this runs.
    async fn stop(&self, ctx: &StopContext);

    /// The value exposed to dependents while up, if any.
    fn value(&self) -> Option<ServiceValue> {
        None
    }
}

/// Passed to [`Service::start`].
pub struct StartContext {
    name: ServiceName,
    container: ServiceContainer,
}

impl StartContext {
    pub(crate) fn new(name: ServiceName, container: ServiceContainer) -> Self {
        Self { name, container }
    }

    /// Name this service was installed under.
    pub fn service_name(&self) -> &ServiceName {
        &self.name
    }

    /// Target for installing services whose lifetime is bounded by this one.
    pub fn child_target(&self) -> ServiceTarget {
        self.container.child_target(self.name.clone())
    }

    pub fn container(&self) -> &ServiceContainer {
        &self.container
    }
}

/// Passed to [`Service::stop`].
pub struct StopContext {
    name: ServiceName,
    container: ServiceContainer,
}

impl StopContext {
    pub(crate) fn new(name: ServiceName, container: ServiceContainer) -> Self {
        Self { name, container }
    }

    /// Name this service was installed under.
    pub fn service_name(&self) -> &ServiceName {
        &self.name
    }

    pub fn container(&self) -> &ServiceContainer {
        &self.container
    }
}

/// A service that does no work and exposes a constant value.
///
/// Used for configuration-like collaborators that dependents consume by
/// injection, such as the processor chain table.
pub struct ValueService {
    value: ServiceValue,
}

impl ValueService {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }
}

#[async_trait]
impl Service for ValueService {
    async fn start(&self, _ctx: &StartContext) -> Result<(), StartError> {
        Ok(())
    }

    async fn stop(&self, _ctx: &StopContext) {}

    fn value(&self) -> Option<ServiceValue> {
        Some(self.value.clone())
    }
}
