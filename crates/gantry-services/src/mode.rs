//! Service controller modes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Controls when the container starts and stops a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Start as soon as dependencies are up, and demand them (a lazy
    /// dependency of an active service gets started).
    Active,
    /// Start as soon as dependencies happen to be up, without demanding
    /// anything.
    Passive,
    /// Start only while at least one active dependent demands it.
    Lazy,
    /// Keep the service down without unregistering it.
    Never,
    /// Stop the service and unregister it, together with everything installed
    /// through its child targets.
    Remove,
}

impl Mode {
    /// Whether this mode ever allows the service to run.
    pub fn allows_start(self) -> bool {
        matches!(self, Mode::Active | Mode::Passive | Mode::Lazy)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Mode::Active => "active",
            Mode::Passive => "passive",
            Mode::Lazy => "lazy",
            Mode::Never => "never",
            Mode::Remove => "remove",
        };
        f.write_str(text)
    }
}
