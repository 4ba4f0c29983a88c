//! Phase contexts

use std::sync::Arc;

use gantry_attachments::{
    Attachable, AttachmentError, AttachmentKey, AttachmentStore, ListAttachmentKey,
};
use gantry_services::{ErasedInjectedValue, ServiceName, ServiceTarget, ServiceValue};

use crate::attachments::{NEXT_PHASE_ATTACHABLE_DEPS, NEXT_PHASE_DEPS};
use crate::names::deployment_phase_name;
use crate::phase::Phase;
use crate::registry::DeploymentUnitRegistry;
use crate::unit::DeploymentUnit;

/// The per-phase view handed to each processor.
///
/// Carries the deployment unit, a scratch attachment store that lives for
/// this phase only, and the service target processors install runtime
/// services through. Dependencies recorded here are honored by the *next*
/// phase: its service is installed with matching edges and will not start
/// until every recorded name is up.
pub struct DeploymentPhaseContext {
    unit: Arc<DeploymentUnit>,
    phase: Phase,
    target: ServiceTarget,
    unit_registry: Arc<DeploymentUnitRegistry>,
    attachments: AttachmentStore,
}

impl DeploymentPhaseContext {
    pub(crate) fn new(
        unit: Arc<DeploymentUnit>,
        phase: Phase,
        target: ServiceTarget,
        unit_registry: Arc<DeploymentUnitRegistry>,
    ) -> Self {
        Self {
            unit,
            phase,
            target,
            unit_registry,
            attachments: AttachmentStore::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn deployment_unit(&self) -> &Arc<DeploymentUnit> {
        &self.unit
    }

    /// Target for runtime services. Anything installed through it lives
    /// only as long as this phase's service stays up.
    pub fn service_target(&self) -> &ServiceTarget {
        &self.target
    }

    pub fn unit_registry(&self) -> &Arc<DeploymentUnitRegistry> {
        &self.unit_registry
    }

    /// Name of the phase service this context belongs to.
    pub fn service_name(&self) -> ServiceName {
        deployment_phase_name(self.unit.service_name(), self.phase)
    }

    /// Require `name` to be up before the next phase runs.
    pub fn requires(&self, name: ServiceName) {
        self.attachments.add_to_list(*NEXT_PHASE_DEPS, name);
    }

    /// Require `name` and attach its exposed value to the next phase's
    /// context under `key`.
    pub fn add_dependency<T>(&self, name: ServiceName, key: AttachmentKey<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.push_attachable(name, AttachTarget::NextContext, Arc::new(ScalarAttacher { key }));
    }

    /// Require `name` and append its exposed value to a list on the next
    /// phase's context under `key`.
    pub fn add_dependency_to_list<T>(&self, name: ServiceName, key: ListAttachmentKey<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.push_attachable(name, AttachTarget::NextContext, Arc::new(ListAttacher { key }));
    }

    /// Require `name` and attach its exposed value to the deployment unit
    /// itself, where every later phase keeps seeing it.
    pub fn add_deployment_dependency<T>(&self, name: ServiceName, key: AttachmentKey<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.push_attachable(name, AttachTarget::Unit, Arc::new(ScalarAttacher { key }));
    }

    /// Require `name` and append its exposed value to a list on the
    /// deployment unit itself.
    pub fn add_deployment_dependency_to_list<T>(&self, name: ServiceName, key: ListAttachmentKey<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.push_attachable(name, AttachTarget::Unit, Arc::new(ListAttacher { key }));
    }

    fn push_attachable(
        &self,
        service_name: ServiceName,
        target: AttachTarget,
        attacher: Arc<dyn ErasedAttacher>,
    ) {
        self.attachments.add_to_list(
            *NEXT_PHASE_ATTACHABLE_DEPS,
            AttachableDependency {
                service_name,
                target,
                attacher,
                injected: ErasedInjectedValue::new(),
            },
        );
    }

    pub(crate) fn take_next_phase_deps(&self) -> Vec<ServiceName> {
        self.attachments.remove_list(*NEXT_PHASE_DEPS)
    }

    pub(crate) fn take_attachable_deps(&self) -> Vec<AttachableDependency> {
        self.attachments.remove_list(*NEXT_PHASE_ATTACHABLE_DEPS)
    }
}

impl Attachable for DeploymentPhaseContext {
    fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }
}

/// Where an attachable dependency's value lands when the next phase starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttachTarget {
    /// On the deployment unit, surviving into every later phase.
    Unit,
    /// On the next phase's context only.
    NextContext,
}

/// A dependency whose value is attached before the next phase's processors
/// run. The erased cell is registered with the container as the injector;
/// the attacher knows the expected type and the destination key.
#[derive(Clone)]
pub(crate) struct AttachableDependency {
    pub(crate) service_name: ServiceName,
    pub(crate) target: AttachTarget,
    pub(crate) attacher: Arc<dyn ErasedAttacher>,
    pub(crate) injected: ErasedInjectedValue,
}

/// Applies a resolved dependency value to an attachment store.
pub(crate) trait ErasedAttacher: Send + Sync {
    fn attach(&self, store: &AttachmentStore, value: &ServiceValue) -> Result<(), AttachmentError>;
}

struct ScalarAttacher<T> {
    key: AttachmentKey<T>,
}

impl<T: Clone + Send + Sync + 'static> ErasedAttacher for ScalarAttacher<T> {
    fn attach(&self, store: &AttachmentStore, value: &ServiceValue) -> Result<(), AttachmentError> {
        let Some(typed) = value.downcast_ref::<T>() else {
            return Err(AttachmentError::TypeMismatch {
                key: self.key.name(),
                expected: std::any::type_name::<T>(),
            });
        };
        store.put(self.key, typed.clone());
        Ok(())
    }
}

struct ListAttacher<T> {
    key: ListAttachmentKey<T>,
}

impl<T: Clone + Send + Sync + 'static> ErasedAttacher for ListAttacher<T> {
    fn attach(&self, store: &AttachmentStore, value: &ServiceValue) -> Result<(), AttachmentError> {
        let Some(typed) = value.downcast_ref::<T>() else {
            return Err(AttachmentError::TypeMismatch {
                key: self.key.name(),
                expected: std::any::type_name::<T>(),
            });
        };
        store.add_to_list(self.key, typed.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::deployment_unit_name;
    use gantry_services::ServiceContainer;

    fn context(phase: Phase) -> DeploymentPhaseContext {
        let container = ServiceContainer::new();
        let unit = Arc::new(DeploymentUnit::new(
            "app.war",
            deployment_unit_name("app.war"),
            None,
            container.registry(),
        ));
        DeploymentPhaseContext::new(
            unit,
            phase,
            container.target(),
            Arc::new(DeploymentUnitRegistry::new()),
        )
    }

    #[test]
    fn recorded_dependencies_drain_in_order() {
        let ctx = context(Phase::Dependencies);
        ctx.requires(ServiceName::of("datasource"));
        ctx.requires(ServiceName::of("mail-session"));

        let names = ctx.take_next_phase_deps();
        assert_eq!(
            names,
            vec![ServiceName::of("datasource"), ServiceName::of("mail-session")]
        );
        assert!(ctx.take_next_phase_deps().is_empty());
    }

    #[test]
    fn attachable_dependencies_record_their_destination() {
        let ctx = context(Phase::Dependencies);
        let scalar: AttachmentKey<String> = AttachmentKey::create("endpoint");
        let listed: ListAttachmentKey<String> = ListAttachmentKey::create("endpoints");

        ctx.add_dependency(ServiceName::of("endpoint-a"), scalar);
        ctx.add_deployment_dependency_to_list(ServiceName::of("endpoint-b"), listed);

        let deps = ctx.take_attachable_deps();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].target, AttachTarget::NextContext);
        assert_eq!(deps[1].target, AttachTarget::Unit);
        assert_eq!(deps[1].service_name, ServiceName::of("endpoint-b"));
    }

    #[test]
    fn scalar_attacher_rejects_a_mismatched_value() {
        let ctx = context(Phase::Install);
        let key: AttachmentKey<String> = AttachmentKey::create("text");
        ctx.add_dependency(ServiceName::of("value"), key);

        let dep = ctx.take_attachable_deps().remove(0);
        let store = AttachmentStore::new();
        let wrong: ServiceValue = Arc::new(17_u32);
        let err = dep
            .attacher
            .attach(&store, &wrong)
            .expect_err("u32 must not attach under a String key");
        assert!(matches!(err, AttachmentError::TypeMismatch { key: "text", .. }));

        let right: ServiceValue = Arc::new("query-endpoint".to_string());
        dep.attacher.attach(&store, &right).expect("matching type attaches");
        assert_eq!(store.get(key), Some("query-endpoint".to_string()));
    }
}
