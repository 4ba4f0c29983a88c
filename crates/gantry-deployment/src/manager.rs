//! The deployment manager

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use gantry_content::{ContentHash, ContentRepository};
use gantry_services::{Mode, ServiceContainer, ServiceName, ServiceState, ValueService};

use crate::chain::DeployerChains;
use crate::error::{DeployerError, Result};
use crate::names::{deployer_chains_name, deployment_phase_name, deployment_unit_name};
use crate::phase::Phase;
use crate::registry::DeploymentUnitRegistry;
use crate::unit_service::RootDeploymentUnitService;

/// What to deploy: the management name, an optional distinct runtime name,
/// and the hash of previously stored content.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    pub name: String,
    pub runtime_name: Option<String>,
    pub hash: ContentHash,
}

impl DeploymentPlan {
    pub fn new(name: impl Into<String>, hash: ContentHash) -> Self {
        Self {
            name: name.into(),
            runtime_name: None,
            hash,
        }
    }

    pub fn with_runtime_name(mut self, runtime_name: impl Into<String>) -> Self {
        self.runtime_name = Some(runtime_name.into());
        self
    }
}

/// Front door for installing and removing deployments.
///
/// Owns the unit arena and verifies content before any service is touched;
/// everything after `deploy` returns happens asynchronously inside the
/// container.
pub struct DeploymentManager {
    container: ServiceContainer,
    content: Arc<dyn ContentRepository>,
    units: Arc<DeploymentUnitRegistry>,
}

impl DeploymentManager {
    /// Create a manager and install the shared deployer chains into the
    /// container.
    pub fn new(
        container: ServiceContainer,
        content: Arc<dyn ContentRepository>,
        chains: DeployerChains,
    ) -> Result<Self> {
        container
            .target()
            .add_service(deployer_chains_name(), Arc::new(ValueService::new(chains)))
            .install()?;
        Ok(Self {
            container,
            content,
            units: Arc::new(DeploymentUnitRegistry::new()),
        })
    }

    pub fn container(&self) -> &ServiceContainer {
        &self.container
    }

    pub fn unit_registry(&self) -> &Arc<DeploymentUnitRegistry> {
        &self.units
    }

    /// Install a deployment. Content is verified first: a plan whose hash
    /// has no stored content fails here, before any service exists for it.
    /// Returns the unit service name; the pipeline runs asynchronously from
    /// here.
    #[instrument(skip(self, plan), fields(name = %plan.name))]
    pub async fn deploy(&self, plan: DeploymentPlan) -> Result<ServiceName> {
        if !self.content.has_content(&plan.hash).await {
            return Err(DeployerError::MissingContent(plan.hash));
        }
        let content_path = self.content.content_path(&plan.hash).await?;
        let unit_name = deployment_unit_name(&plan.name);
        if self.container.is_registered(&unit_name) {
            return Err(DeployerError::DuplicateDeployment(plan.name));
        }
        let runtime_name = plan.runtime_name.unwrap_or_else(|| plan.name.clone());
        info!(runtime_name = %runtime_name, hash = %plan.hash, "Deploying");

        let service = Arc::new(RootDeploymentUnitService::new(
            plan.name,
            runtime_name,
            plan.hash,
            content_path,
            self.units.clone(),
        ));
        self.container
            .target()
            .add_service(unit_name.clone(), service)
            .install()?;
        Ok(unit_name)
    }

    /// Remove a deployment and wait until every service it installed is
    /// gone.
    #[instrument(skip(self))]
    pub async fn undeploy(&self, name: &str) -> Result<()> {
        let unit_name = deployment_unit_name(name);
        self.container
            .set_mode(&unit_name, Mode::Remove)
            .map_err(|_| DeployerError::UnknownDeployment(name.to_string()))?;
        self.container.await_removal(&unit_name).await;
        info!(name, "Undeployed");
        Ok(())
    }

    /// Wait for `name`'s pipeline to finish: resolves once the final phase
    /// is up, or reports the first retained failure below the deployment or
    /// its sub-deployments.
    pub async fn await_deployed(&self, name: &str) -> Result<()> {
        let unit_name = deployment_unit_name(name);
        let final_phase = deployment_phase_name(&unit_name, Phase::LAST);
        let sub_prefix = ServiceName::from_segments(["subunit", name]);
        let mut rx = self.container.subscribe();
        loop {
            let failure = self
                .container
                .find_failure_under(&unit_name)
                .or_else(|| self.container.find_failure_under(&sub_prefix));
            if let Some((service, err)) = failure {
                return Err(DeployerError::DeploymentFailed {
                    service,
                    message: error_chain(err.as_ref()),
                });
            }
            if self.container.service_state(&final_phase) == Some(ServiceState::Up) {
                return Ok(());
            }
            if !self.container.is_registered(&unit_name) {
                return Err(DeployerError::UnknownDeployment(name.to_string()));
            }
            match rx.recv().await {
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(DeployerError::UnknownDeployment(name.to_string()));
                }
            }
        }
    }
}

/// Flatten an error and its causes into one `: `-joined message.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_chain_joins_causes() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let outer = crate::error::DeploymentUnitProcessingError::with_cause("step failed", inner);
        assert_eq!(error_chain(&outer), "step failed: boom");
    }
}
