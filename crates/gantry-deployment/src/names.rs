//! Service name layout for deployments

use gantry_services::ServiceName;

use crate::phase::Phase;

/// Name of the bootstrap service of a top-level deployment: `unit/<name>`.
pub fn deployment_unit_name(name: &str) -> ServiceName {
    ServiceName::from_segments(["unit", name])
}

/// Name of the bootstrap service of a sub-deployment:
/// `subunit/<parent>/<name>`, where `<parent>` is the parent's simple name.
pub fn sub_deployment_unit_name(parent: &str, name: &str) -> ServiceName {
    ServiceName::from_segments(["subunit", parent, name])
}

/// Name of a unit's phase service: the unit service name with the phase
/// appended.
pub fn deployment_phase_name(unit_name: &ServiceName, phase: Phase) -> ServiceName {
    unit_name.append(phase.name())
}

/// Name of the shared deployer chains value service.
pub fn deployer_chains_name() -> ServiceName {
    ServiceName::of("deployment-chains")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_the_documented_layout() {
        assert_eq!(deployment_unit_name("shop.war").to_string(), "unit/shop.war");
        assert_eq!(
            sub_deployment_unit_name("shop.ear", "web.war").to_string(),
            "subunit/shop.ear/web.war"
        );
        assert_eq!(
            deployment_phase_name(&deployment_unit_name("shop.war"), Phase::ConfigureModule)
                .to_string(),
            "unit/shop.war/CONFIGURE_MODULE"
        );
    }
}
