//! Processor chains

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DeployerError, Result};
use crate::phase::Phase;
use crate::processor::DeploymentUnitProcessor;

/// Ordering weight of a processor within its phase. Lower runs earlier;
/// equal priorities are ordered by processor name. Leave gaps between
/// chosen values so later registrations can slot in between existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(u32);

impl Priority {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A processor registered into one phase of the chains.
pub struct RegisteredProcessor {
    priority: Priority,
    name: String,
    subsystem: String,
    processor: Arc<dyn DeploymentUnitProcessor>,
}

impl RegisteredProcessor {
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The subsystem the processor belongs to, checked against each unit's
    /// exclusion list.
    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn processor(&self) -> &Arc<dyn DeploymentUnitProcessor> {
        &self.processor
    }
}

/// The complete, ordered processor chains for every phase.
///
/// Built once at startup and then shared immutably by every deployment
/// moving through the container.
pub struct DeployerChains {
    phases: HashMap<Phase, Vec<RegisteredProcessor>>,
}

impl DeployerChains {
    pub fn builder() -> DeployerChainsBuilder {
        DeployerChainsBuilder {
            entries: Vec::new(),
        }
    }

    /// The ordered chain for `phase`. Phases nothing registered into are
    /// empty.
    pub fn processors(&self, phase: Phase) -> &[RegisteredProcessor] {
        self.phases.get(&phase).map_or(&[], Vec::as_slice)
    }
}

impl fmt::Debug for DeployerChains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts = f.debug_struct("DeployerChains");
        for phase in Phase::ALL {
            counts.field(phase.name(), &self.processors(phase).len());
        }
        counts.finish()
    }
}

/// Collects processor registrations, then orders and validates them.
pub struct DeployerChainsBuilder {
    entries: Vec<(Phase, RegisteredProcessor)>,
}

impl DeployerChainsBuilder {
    pub fn add(
        mut self,
        phase: Phase,
        priority: Priority,
        subsystem: impl Into<String>,
        processor: Arc<dyn DeploymentUnitProcessor>,
    ) -> Self {
        let name = processor.name().to_string();
        self.entries.push((
            phase,
            RegisteredProcessor {
                priority,
                name,
                subsystem: subsystem.into(),
                processor,
            },
        ));
        self
    }

    /// Order every phase's chain by priority then name, rejecting two
    /// registrations that would tie on both.
    pub fn build(self) -> Result<DeployerChains> {
        let mut phases: HashMap<Phase, Vec<RegisteredProcessor>> = HashMap::new();
        for (phase, registered) in self.entries {
            phases.entry(phase).or_default().push(registered);
        }
        for (phase, chain) in &mut phases {
            chain.sort_by(|a, b| (a.priority, a.name.as_str()).cmp(&(b.priority, b.name.as_str())));
            for pair in chain.windows(2) {
                if pair[0].priority == pair[1].priority && pair[0].name == pair[1].name {
                    return Err(DeployerError::DuplicateProcessor {
                        phase: *phase,
                        priority: pair[0].priority,
                        name: pair[0].name.clone(),
                    });
                }
            }
        }
        Ok(DeployerChains { phases })
    }
}
