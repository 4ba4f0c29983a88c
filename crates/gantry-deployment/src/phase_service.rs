//! The phase execution engine

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use gantry_attachments::Attachable;
use gantry_services::{
    InjectedValue, Mode, Service, ServiceValue, StartContext, StartError, StopContext,
};

use crate::attachments::{DEFERRED_MODULE, DEFERRED_MODULES, EXCLUDED_SUBSYSTEMS, SUB_DEPLOYMENT_NAMES};
use crate::chain::{DeployerChains, RegisteredProcessor};
use crate::context::{AttachTarget, AttachableDependency, DeploymentPhaseContext};
use crate::names::{deployer_chains_name, deployment_phase_name};
use crate::phase::Phase;
use crate::registry::DeploymentUnitRegistry;
use crate::unit::DeploymentUnit;

/// Runs one phase of one deployment unit.
///
/// The container starts this service once the previous phase's service and
/// every dependency recorded for this phase are up. Starting means: replay
/// attached dependency values, run the phase's processors in chain order,
/// then install the next phase's service with the edges this phase
/// collected. Stopping undeploys the phase's processors in reverse. A
/// processor failure unwinds the processors that already ran and fails the
/// start, so no service for this or any later phase is left behind.
pub(crate) struct DeploymentUnitPhaseService {
    unit: Arc<DeploymentUnit>,
    phase: Phase,
    unit_registry: Arc<DeploymentUnitRegistry>,
    chains: InjectedValue<DeployerChains>,
    /// Dependencies the previous phase collected, whose values attach to
    /// this phase's unit or context before any processor runs.
    attached: Vec<AttachableDependency>,
}

impl DeploymentUnitPhaseService {
    pub(crate) fn new(
        unit: Arc<DeploymentUnit>,
        phase: Phase,
        unit_registry: Arc<DeploymentUnitRegistry>,
        attached: Vec<AttachableDependency>,
    ) -> Self {
        Self {
            unit,
            phase,
            unit_registry,
            chains: InjectedValue::new(),
            attached,
        }
    }

    /// The injector wired to the shared chains service at install time.
    pub(crate) fn chains_injector(&self) -> InjectedValue<DeployerChains> {
        self.chains.clone()
    }

    /// Whether `subsystem` is excluded for this unit. The unit's own list
    /// wins; a unit that never materialized one falls back to its parent's.
    fn excluded(&self, subsystem: &str) -> bool {
        if self.unit.has_attachment_list(*EXCLUDED_SUBSYSTEMS) {
            return self
                .unit
                .get_attachment_list(*EXCLUDED_SUBSYSTEMS)
                .iter()
                .any(|s| s == subsystem);
        }
        let parent = self
            .unit
            .parent_name()
            .and_then(|name| self.unit_registry.get(name));
        match parent {
            Some(parent) => parent
                .get_attachment_list(*EXCLUDED_SUBSYSTEMS)
                .iter()
                .any(|s| s == subsystem),
            None => false,
        }
    }

    /// Undeploy `processors` in reverse order, logging failures without
    /// interrupting the unwind.
    async fn undeploy_processors(&self, processors: &[RegisteredProcessor]) {
        for registered in processors.iter().rev() {
            if self.excluded(registered.subsystem()) {
                continue;
            }
            if let Err(err) = registered.processor().undeploy(&self.unit).await {
                error!(
                    processor = registered.name(),
                    phase = %self.phase,
                    unit = %self.unit,
                    error = %err,
                    "Undeploy failed; continuing"
                );
            }
        }
    }

    /// Mode for the next phase's service. Deferred units reaching first
    /// module use go passive unless they are the last deferred sibling
    /// under their top-level unit.
    fn next_phase_mode(&self, next: Phase) -> Mode {
        if next != Phase::FirstModuleUse {
            return Mode::Active;
        }
        if !self.unit.get_attachment(*DEFERRED_MODULE).unwrap_or(false) {
            return Mode::Active;
        }
        let top = match self.unit_registry.top_unit_of(self.unit.service_name()) {
            Some(top) => top,
            None => return Mode::Active,
        };
        let Some(deferred) = top.get_attachment(*DEFERRED_MODULES) else {
            return Mode::Active;
        };
        if deferred.remove_and_check_empty(self.unit.name()) {
            Mode::Active
        } else {
            info!(unit = %self.unit, "Deferring first module use until sibling deployments are ready");
            Mode::Passive
        }
    }
}

#[async_trait]
impl Service for DeploymentUnitPhaseService {
    async fn start(&self, ctx: &StartContext) -> Result<(), StartError> {
        let Some(chains) = self.chains.get() else {
            return Err(StartError::new(format!(
                "deployer chains are not available to phase {} of {}",
                self.phase, self.unit
            )));
        };

        let context = DeploymentPhaseContext::new(
            self.unit.clone(),
            self.phase,
            ctx.child_target(),
            self.unit_registry.clone(),
        );

        // dependency values collected by the previous phase land before any
        // processor runs
        for dep in &self.attached {
            let Some(value) = dep.injected.get() else {
                return Err(StartError::new(format!(
                    "dependency {} of {} provided no value",
                    dep.service_name, self.unit
                )));
            };
            let store = match dep.target {
                AttachTarget::Unit => self.unit.attachments(),
                AttachTarget::NextContext => context.attachments(),
            };
            if let Err(err) = dep.attacher.attach(store, &value) {
                return Err(StartError::with_cause(
                    format!(
                        "failed to attach dependency {} of {}",
                        dep.service_name, self.unit
                    ),
                    err,
                ));
            }
        }

        let processors = chains.processors(self.phase);
        debug!(unit = %self.unit, phase = %self.phase, count = processors.len(), "Running phase");

        for (index, registered) in processors.iter().enumerate() {
            if self.excluded(registered.subsystem()) {
                debug!(
                    processor = registered.name(),
                    unit = %self.unit,
                    "Skipping processor of excluded subsystem"
                );
                continue;
            }
            if let Err(err) = registered.processor().deploy(&context).await {
                error!(
                    processor = registered.name(),
                    phase = %self.phase,
                    unit = %self.unit,
                    error = %err,
                    "Deploy failed; undeploying completed processors"
                );
                self.undeploy_processors(&processors[..index]).await;
                return Err(StartError::with_cause(
                    format!("failed to process phase {} of {}", self.phase, self.unit),
                    err,
                ));
            }
        }

        let Some(next) = self.phase.next() else {
            info!(unit = %self.unit, "Deployment processing complete");
            return Ok(());
        };

        // install the next phase under this service, wired to start only
        // when everything this phase asked for is up
        let attachable = context.take_attachable_deps();
        let next_name = deployment_phase_name(self.unit.service_name(), next);
        let next_service = Arc::new(DeploymentUnitPhaseService::new(
            self.unit.clone(),
            next,
            self.unit_registry.clone(),
            attachable.clone(),
        ));
        let chains_injector = Arc::new(next_service.chains_injector());

        let mut builder = context
            .service_target()
            .add_service(next_name, next_service)
            .requires_value(deployer_chains_name(), chains_injector)
            .requires(ctx.service_name().clone());
        for dep_name in context.take_next_phase_deps() {
            builder = builder.requires(dep_name);
        }
        for dep in &attachable {
            builder = builder.requires_value(dep.service_name.clone(), Arc::new(dep.injected.clone()));
        }
        if let Some(parent) = self.unit.parent_name() {
            builder = builder.requires(deployment_phase_name(parent, next));
        }
        for sub in self.unit.get_attachment_list(*SUB_DEPLOYMENT_NAMES) {
            builder = builder.requires(deployment_phase_name(&sub, self.phase));
        }

        builder
            .initial_mode(self.next_phase_mode(next))
            .install()
            .map_err(|err| {
                StartError::with_cause(
                    format!("failed to install phase {} of {}", next, self.unit),
                    err,
                )
            })?;
        Ok(())
    }

    async fn stop(&self, _ctx: &StopContext) {
        let Some(chains) = self.chains.get() else {
            warn!(
                unit = %self.unit,
                phase = %self.phase,
                "Chains unavailable during undeploy; skipping processors"
            );
            return;
        };
        debug!(unit = %self.unit, phase = %self.phase, "Undeploying phase");
        self.undeploy_processors(chains.processors(self.phase)).await;
    }

    /// Dependents of a phase service see the deployment unit itself.
    fn value(&self) -> Option<ServiceValue> {
        Some(self.unit.clone())
    }
}
