//! Deployment unit bootstrap services
//!
//! One bootstrap service per unit anchors the whole phase chain: starting it
//! creates the unit, registers it in the arena, and installs the first phase
//! service; stopping it unwinds the chain, waits for every phase to be fully
//! removed, and releases the unit.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use gantry_attachments::Attachable;
use gantry_content::ContentHash;
use gantry_services::{
    Mode, Service, ServiceName, ServiceValue, StartContext, StartError, StopContext,
};

use crate::attachments::{
    CONTENT_HASH, DEPLOYMENT_CONTENTS, DEPLOYMENT_ROOT, MANAGEMENT_NAME, RUNTIME_NAME,
    SUB_DEPLOYMENT_NAMES,
};
use crate::context::DeploymentPhaseContext;
use crate::error::Result;
use crate::names::{deployer_chains_name, deployment_phase_name, sub_deployment_unit_name};
use crate::phase::Phase;
use crate::phase_service::DeploymentUnitPhaseService;
use crate::registry::DeploymentUnitRegistry;
use crate::unit::DeploymentUnit;

struct StartedUnit {
    unit: Arc<DeploymentUnit>,
    since: Instant,
}

/// Bootstrap service of a top-level deployment, installed under
/// `unit/<name>`.
pub(crate) struct RootDeploymentUnitService {
    name: String,
    runtime_name: String,
    hash: ContentHash,
    content_path: PathBuf,
    unit_registry: Arc<DeploymentUnitRegistry>,
    started: Mutex<Option<StartedUnit>>,
}

impl RootDeploymentUnitService {
    pub(crate) fn new(
        name: String,
        runtime_name: String,
        hash: ContentHash,
        content_path: PathBuf,
        unit_registry: Arc<DeploymentUnitRegistry>,
    ) -> Self {
        Self {
            name,
            runtime_name,
            hash,
            content_path,
            unit_registry,
            started: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Service for RootDeploymentUnitService {
    async fn start(&self, ctx: &StartContext) -> std::result::Result<(), StartError> {
        let service_name = ctx.service_name().clone();
        let unit = Arc::new(DeploymentUnit::new(
            self.name.clone(),
            service_name.clone(),
            None,
            ctx.container().registry(),
        ));
        unit.put_attachment(*RUNTIME_NAME, self.runtime_name.clone());
        unit.put_attachment(*MANAGEMENT_NAME, self.name.clone());
        unit.put_attachment(*CONTENT_HASH, self.hash);
        unit.put_attachment(*DEPLOYMENT_CONTENTS, self.content_path.clone());
        self.unit_registry.register(unit.clone());
        info!(name = %self.name, runtime_name = %self.runtime_name, "Starting deployment");

        install_first_phase(ctx, &unit, self.unit_registry.clone()).map_err(|err| {
            StartError::with_cause(
                format!("failed to install the first phase of deployment {}", self.name),
                err,
            )
        })?;

        *self.started.lock() = Some(StartedUnit {
            unit,
            since: Instant::now(),
        });
        Ok(())
    }

    async fn stop(&self, ctx: &StopContext) {
        let Some(started) = self.started.lock().take() else {
            return;
        };
        unwind_phases(ctx, &started).await;
        self.unit_registry.deregister(started.unit.service_name());
        info!(
            name = %self.name,
            elapsed_ms = started.since.elapsed().as_millis() as u64,
            "Stopped deployment"
        );
    }

    fn value(&self) -> Option<ServiceValue> {
        self.started
            .lock()
            .as_ref()
            .map(|started| -> ServiceValue { started.unit.clone() })
    }
}

/// Bootstrap service of a sub-deployment, installed under
/// `subunit/<parent>/<name>` by a processor of the parent.
pub(crate) struct SubDeploymentUnitService {
    name: String,
    parent_name: ServiceName,
    mount_root: PathBuf,
    unit_registry: Arc<DeploymentUnitRegistry>,
    started: Mutex<Option<StartedUnit>>,
}

impl SubDeploymentUnitService {
    pub(crate) fn new(
        name: String,
        parent_name: ServiceName,
        mount_root: PathBuf,
        unit_registry: Arc<DeploymentUnitRegistry>,
    ) -> Self {
        Self {
            name,
            parent_name,
            mount_root,
            unit_registry,
            started: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Service for SubDeploymentUnitService {
    async fn start(&self, ctx: &StartContext) -> std::result::Result<(), StartError> {
        let service_name = ctx.service_name().clone();
        let unit = Arc::new(DeploymentUnit::new(
            self.name.clone(),
            service_name.clone(),
            Some(self.parent_name.clone()),
            ctx.container().registry(),
        ));
        unit.put_attachment(*RUNTIME_NAME, self.name.clone());
        unit.put_attachment(*DEPLOYMENT_ROOT, self.mount_root.clone());
        self.unit_registry.register(unit.clone());
        info!(name = %self.name, parent = %self.parent_name, "Starting subdeployment");

        install_first_phase(ctx, &unit, self.unit_registry.clone()).map_err(|err| {
            StartError::with_cause(
                format!(
                    "failed to install the first phase of subdeployment {}",
                    self.name
                ),
                err,
            )
        })?;

        *self.started.lock() = Some(StartedUnit {
            unit,
            since: Instant::now(),
        });
        Ok(())
    }

    async fn stop(&self, ctx: &StopContext) {
        let Some(started) = self.started.lock().take() else {
            return;
        };
        unwind_phases(ctx, &started).await;
        self.unit_registry.deregister(started.unit.service_name());
        info!(
            name = %self.name,
            elapsed_ms = started.since.elapsed().as_millis() as u64,
            "Stopped subdeployment"
        );
    }

    fn value(&self) -> Option<ServiceValue> {
        self.started
            .lock()
            .as_ref()
            .map(|started| -> ServiceValue { started.unit.clone() })
    }
}

/// Install the first phase service as a child of the bootstrap, gated on
/// the bootstrap itself and on the shared chains value.
fn install_first_phase(
    ctx: &StartContext,
    unit: &Arc<DeploymentUnit>,
    unit_registry: Arc<DeploymentUnitRegistry>,
) -> gantry_services::Result<()> {
    let phase_name = deployment_phase_name(unit.service_name(), Phase::FIRST);
    let service = Arc::new(DeploymentUnitPhaseService::new(
        unit.clone(),
        Phase::FIRST,
        unit_registry,
        Vec::new(),
    ));
    let chains_injector = Arc::new(service.chains_injector());
    ctx.child_target()
        .add_service(phase_name, service)
        .requires(unit.service_name().clone())
        .requires_value(deployer_chains_name(), chains_injector)
        .install()
}

/// Remove the unit's first phase service and wait for the chain above it to
/// unwind completely.
async fn unwind_phases(ctx: &StopContext, started: &StartedUnit) {
    let container = ctx.container();
    let first_phase = deployment_phase_name(started.unit.service_name(), Phase::FIRST);
    if container.set_mode(&first_phase, Mode::Remove).is_ok() {
        container.await_removal(&first_phase).await;
    }
}

/// Install a sub-deployment discovered while processing `ctx`'s unit.
///
/// Meant for structure-phase processors of the parent. The sub's service
/// name is recorded on the parent before its bootstrap is installed, so the
/// parent's next phase waits for the sub even if the bootstrap is still
/// starting. Registering a name that is already recorded is a no-op.
pub fn install_sub_deployment(
    ctx: &DeploymentPhaseContext,
    name: &str,
    mount_root: PathBuf,
) -> Result<ServiceName> {
    let parent = ctx.deployment_unit();
    let sub_name = sub_deployment_unit_name(parent.name(), name);
    if parent
        .get_attachment_list(*SUB_DEPLOYMENT_NAMES)
        .contains(&sub_name)
    {
        return Ok(sub_name);
    }
    parent.add_to_attachment_list(*SUB_DEPLOYMENT_NAMES, sub_name.clone());

    let service = Arc::new(SubDeploymentUnitService::new(
        name.to_string(),
        parent.service_name().clone(),
        mount_root,
        ctx.unit_registry().clone(),
    ));
    ctx.service_target()
        .add_service(sub_name.clone(), service)
        .requires(parent.service_name().clone())
        .install()?;
    Ok(sub_name)
}
