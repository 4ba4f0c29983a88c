//! The deployment unit processor contract

use async_trait::async_trait;

use crate::context::DeploymentPhaseContext;
use crate::error::DeploymentUnitProcessingError;
use crate::unit::DeploymentUnit;

/// One step of one phase in the deployment pipeline.
///
/// Processors are registered into a phase at a priority and run in order
/// against every deployment unit passing through that phase. `deploy` and
/// `undeploy` must stay symmetric: whatever `deploy` attaches or installs,
/// `undeploy` takes back. `undeploy` must also tolerate a unit this
/// processor never deployed.
#[async_trait]
pub trait DeploymentUnitProcessor: Send + Sync {
    /// Diagnostic name. Also breaks priority ties when chains are built.
    fn name(&self) -> &str;

    /// Run this step against the unit behind `context`.
    async fn deploy(
        &self,
        context: &DeploymentPhaseContext,
    ) -> std::result::Result<(), DeploymentUnitProcessingError>;

    /// Reverse whatever `deploy` did to `unit`. Errors are logged by the
    /// engine and never interrupt the unwind.
    async fn undeploy(
        &self,
        unit: &DeploymentUnit,
    ) -> std::result::Result<(), DeploymentUnitProcessingError> {
        let _ = unit;
        Ok(())
    }
}
