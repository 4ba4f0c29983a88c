//! The deployment unit arena

use dashmap::DashMap;
use std::sync::Arc;

use gantry_services::ServiceName;

use crate::unit::DeploymentUnit;

/// Owns every live deployment unit, keyed by unit service name.
///
/// A unit enters the arena when its bootstrap service starts and leaves when
/// it stops. Processors and services hold `Arc`s into the arena while they
/// run; parent and child units refer to each other by name through it rather
/// than by direct reference.
#[derive(Debug, Default)]
pub struct DeploymentUnitRegistry {
    units: DashMap<ServiceName, Arc<DeploymentUnit>>,
}

impl DeploymentUnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &ServiceName) -> Option<Arc<DeploymentUnit>> {
        self.units.get(name).map(|entry| entry.value().clone())
    }

    /// The parent unit of `name`'s unit, when it is a sub-deployment.
    pub fn parent_of(&self, name: &ServiceName) -> Option<Arc<DeploymentUnit>> {
        let unit = self.get(name)?;
        let parent_name = unit.parent_name()?;
        self.get(parent_name)
    }

    /// Walk up to the top-level unit above `name`. Returns the unit itself
    /// when it has no parent.
    pub fn top_unit_of(&self, name: &ServiceName) -> Option<Arc<DeploymentUnit>> {
        let mut current = self.get(name)?;
        while let Some(parent_name) = current.parent_name() {
            match self.get(parent_name) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Some(current)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub(crate) fn register(&self, unit: Arc<DeploymentUnit>) {
        self.units.insert(unit.service_name().clone(), unit);
    }

    pub(crate) fn deregister(&self, name: &ServiceName) {
        self.units.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::{deployment_unit_name, sub_deployment_unit_name};
    use gantry_services::ServiceContainer;

    fn unit(
        name: &str,
        service_name: ServiceName,
        parent: Option<ServiceName>,
    ) -> Arc<DeploymentUnit> {
        Arc::new(DeploymentUnit::new(
            name,
            service_name,
            parent,
            ServiceContainer::new().registry(),
        ))
    }

    #[test]
    fn arena_resolves_parents_and_top_units_by_name() {
        let registry = DeploymentUnitRegistry::new();
        let ear_name = deployment_unit_name("shop.ear");
        let war_name = sub_deployment_unit_name("shop.ear", "web.war");

        registry.register(unit("shop.ear", ear_name.clone(), None));
        registry.register(unit("web.war", war_name.clone(), Some(ear_name.clone())));

        let parent = registry.parent_of(&war_name).expect("parent resolves");
        assert_eq!(parent.name(), "shop.ear");

        let top = registry.top_unit_of(&war_name).expect("top resolves");
        assert_eq!(top.service_name(), &ear_name);
        let top_of_top = registry.top_unit_of(&ear_name).expect("self resolves");
        assert_eq!(top_of_top.service_name(), &ear_name);
    }

    #[test]
    fn deregistered_units_are_gone() {
        let registry = DeploymentUnitRegistry::new();
        let name = deployment_unit_name("short.war");
        registry.register(unit("short.war", name.clone(), None));
        assert_eq!(registry.len(), 1);

        registry.deregister(&name);
        assert!(registry.get(&name).is_none());
        assert!(registry.is_empty());
    }
}
