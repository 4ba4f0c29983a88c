//! Deferred module bookkeeping

use parking_lot::Mutex;

/// The names of sibling deployments that have not yet reached their first
/// module use.
///
/// Shared through an attachment on the top-level unit. Each deferred sibling
/// removes itself on arrival; the one that drains the list proceeds actively
/// and thereby releases the others.
#[derive(Debug, Default)]
pub struct DeferredModuleList {
    names: Mutex<Vec<String>>,
}

impl DeferredModuleList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: impl Into<String>) {
        self.names.lock().push(name.into());
    }

    /// Remove `name` and report whether the list is now empty.
    ///
    /// Removal and the emptiness check happen under one lock, so however
    /// many siblings arrive concurrently, exactly one of them observes the
    /// list becoming empty.
    pub fn remove_and_check_empty(&self, name: &str) -> bool {
        let mut names = self.names.lock();
        names.retain(|n| n != name);
        names.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.names.lock().is_empty()
    }
}
