//! Subsystem exclusion: processors of an excluded subsystem are skipped on
//! deploy and undeploy, and sub-units inherit the parent's list only while
//! they have none of their own.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use common::{within, Fixture, Recorder, RecordingProcessor};
use gantry_attachments::Attachable;
use gantry_deployment::attachments::EXCLUDED_SUBSYSTEMS;
use gantry_deployment::names::{deployment_phase_name, sub_deployment_unit_name};
use gantry_deployment::{
    install_sub_deployment, DeployerChains, DeploymentPhaseContext,
    DeploymentUnitProcessingError, DeploymentUnitProcessor, Phase, Priority,
};

/// Adds `subsystem` to the exclusion list of either top-level units or
/// sub-units.
struct ExcludeSubsystem {
    subsystem: &'static str,
    on_subs: bool,
}

#[async_trait]
impl DeploymentUnitProcessor for ExcludeSubsystem {
    fn name(&self) -> &str {
        "exclude-subsystem"
    }

    async fn deploy(
        &self,
        context: &DeploymentPhaseContext,
    ) -> Result<(), DeploymentUnitProcessingError> {
        let unit = context.deployment_unit();
        if unit.is_sub_deployment() == self.on_subs {
            unit.add_to_attachment_list(*EXCLUDED_SUBSYSTEMS, self.subsystem.to_string());
        }
        Ok(())
    }
}

/// Mounts one sub-deployment from the top-level unit.
struct MountSub {
    name: &'static str,
}

#[async_trait]
impl DeploymentUnitProcessor for MountSub {
    fn name(&self) -> &str {
        "mount-sub"
    }

    async fn deploy(
        &self,
        context: &DeploymentPhaseContext,
    ) -> Result<(), DeploymentUnitProcessingError> {
        if context.deployment_unit().is_sub_deployment() {
            return Ok(());
        }
        install_sub_deployment(context, self.name, PathBuf::from(self.name)).map_err(|err| {
            DeploymentUnitProcessingError::with_cause(
                format!("failed to mount {}", self.name),
                err,
            )
        })?;
        Ok(())
    }
}

#[tokio::test]
async fn excluded_subsystem_is_skipped_on_deploy_and_undeploy() {
    let recorder = Recorder::new();
    let chains = DeployerChains::builder()
        .add(
            Phase::Structure,
            Priority::new(100),
            "core",
            Arc::new(ExcludeSubsystem {
                subsystem: "web",
                on_subs: false,
            }),
        )
        .add(
            Phase::Parse,
            Priority::new(100),
            "core",
            RecordingProcessor::new("core-step", &recorder),
        )
        .add(
            Phase::Parse,
            Priority::new(200),
            "web",
            RecordingProcessor::new("web-step", &recorder),
        )
        .build()
        .expect("chains should build");
    let fixture = Fixture::new(chains);

    fixture.deploy("app.war", b"app bytes").await;
    within("completion", fixture.manager.await_deployed("app.war"))
        .await
        .expect("pipeline should complete");

    assert!(recorder.contains("deploy:core-step:app.war"));
    assert!(!recorder.contains("deploy:web-step:app.war"));

    within("undeploy", fixture.manager.undeploy("app.war"))
        .await
        .expect("undeploy should complete");

    assert!(recorder.contains("undeploy:core-step:app.war"));
    assert!(!recorder.contains("undeploy:web-step:app.war"));
}

#[tokio::test]
async fn sub_units_inherit_the_parent_exclusion_list() {
    let recorder = Recorder::new();
    let chains = DeployerChains::builder()
        .add(
            Phase::Structure,
            Priority::new(100),
            "core",
            Arc::new(ExcludeSubsystem {
                subsystem: "web",
                on_subs: false,
            }),
        )
        .add(
            Phase::Structure,
            Priority::new(200),
            "core",
            Arc::new(MountSub { name: "web.war" }),
        )
        .add(
            Phase::Parse,
            Priority::new(100),
            "web",
            RecordingProcessor::new("web-step", &recorder),
        )
        .build()
        .expect("chains should build");
    let fixture = Fixture::new(chains);

    fixture.deploy("shop.ear", b"ear bytes").await;
    within("parent completion", fixture.manager.await_deployed("shop.ear"))
        .await
        .expect("parent pipeline should complete");
    within(
        "sub completion",
        fixture.manager.container().await_up(&deployment_phase_name(
            &sub_deployment_unit_name("shop.ear", "web.war"),
            Phase::Cleanup,
        )),
    )
    .await
    .expect("sub pipeline should complete");

    assert!(!recorder.contains("deploy:web-step:shop.ear"));
    assert!(!recorder.contains("deploy:web-step:web.war"));
}

#[tokio::test]
async fn a_sub_units_own_list_overrides_the_parents() {
    let recorder = Recorder::new();
    let chains = DeployerChains::builder()
        .add(
            Phase::Structure,
            Priority::new(100),
            "core",
            Arc::new(ExcludeSubsystem {
                subsystem: "web",
                on_subs: false,
            }),
        )
        .add(
            Phase::Structure,
            Priority::new(150),
            "core",
            Arc::new(ExcludeSubsystem {
                subsystem: "messaging",
                on_subs: true,
            }),
        )
        .add(
            Phase::Structure,
            Priority::new(200),
            "core",
            Arc::new(MountSub { name: "web.war" }),
        )
        .add(
            Phase::Parse,
            Priority::new(100),
            "web",
            RecordingProcessor::new("web-step", &recorder),
        )
        .build()
        .expect("chains should build");
    let fixture = Fixture::new(chains);

    fixture.deploy("shop.ear", b"ear bytes").await;
    within("parent completion", fixture.manager.await_deployed("shop.ear"))
        .await
        .expect("parent pipeline should complete");
    within(
        "sub completion",
        fixture.manager.container().await_up(&deployment_phase_name(
            &sub_deployment_unit_name("shop.ear", "web.war"),
            Phase::Cleanup,
        )),
    )
    .await
    .expect("sub pipeline should complete");

    // the parent's list hides web-step from the parent, while the sub's own
    // list does not name "web", so the sub still runs it
    assert!(!recorder.contains("deploy:web-step:shop.ear"));
    assert!(recorder.contains("deploy:web-step:web.war"));
}
