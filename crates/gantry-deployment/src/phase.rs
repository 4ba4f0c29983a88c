//! Deployment phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed sequence of processing phases every deployment unit moves
/// through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Mount the content and discover the deployment's structure, including
    /// any sub-deployments.
    Structure,
    /// Parse descriptors found within the structure.
    Parse,
    /// Register the deployment with management facilities.
    Register,
    /// Resolve dependencies on other deployments and on system services.
    Dependencies,
    /// Assemble the deployment's module configuration.
    ConfigureModule,
    /// First use of the assembled module. Deferred deployments hold here
    /// until every sibling is ready.
    FirstModuleUse,
    /// Work that needs the module loaded but precedes service installation.
    PostModule,
    /// Install the deployment's runtime services.
    Install,
    /// Release scratch state retained by earlier phases.
    Cleanup,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ALL: [Phase; 9] = [
        Phase::Structure,
        Phase::Parse,
        Phase::Register,
        Phase::Dependencies,
        Phase::ConfigureModule,
        Phase::FirstModuleUse,
        Phase::PostModule,
        Phase::Install,
        Phase::Cleanup,
    ];

    /// The phase a fresh deployment enters.
    pub const FIRST: Phase = Phase::Structure;

    /// The phase that completes the pipeline.
    pub const LAST: Phase = Phase::Cleanup;

    /// The phase following this one, if any.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Structure => Some(Phase::Parse),
            Phase::Parse => Some(Phase::Register),
            Phase::Register => Some(Phase::Dependencies),
            Phase::Dependencies => Some(Phase::ConfigureModule),
            Phase::ConfigureModule => Some(Phase::FirstModuleUse),
            Phase::FirstModuleUse => Some(Phase::PostModule),
            Phase::PostModule => Some(Phase::Install),
            Phase::Install => Some(Phase::Cleanup),
            Phase::Cleanup => None,
        }
    }

    /// Stable upper-case name, used as the final segment of phase service
    /// names.
    pub fn name(self) -> &'static str {
        match self {
            Phase::Structure => "STRUCTURE",
            Phase::Parse => "PARSE",
            Phase::Register => "REGISTER",
            Phase::Dependencies => "DEPENDENCIES",
            Phase::ConfigureModule => "CONFIGURE_MODULE",
            Phase::FirstModuleUse => "FIRST_MODULE_USE",
            Phase::PostModule => "POST_MODULE",
            Phase::Install => "INSTALL",
            Phase::Cleanup => "CLEANUP",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
