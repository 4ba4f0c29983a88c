//! The service container
//!
//! Services are installed under names, declare the names they require, and
//! the container drives them through their lifecycle on tokio tasks: a
//! service starts once every required name is up, stops before any of its
//! dependencies go down, and is removed together with everything installed
//! through its child targets. All bookkeeping lives behind one lock; each
//! state change re-evaluates the whole graph until it reaches a fixpoint.
//!
//! The container must be used from within a tokio runtime, since lifecycle
//! transitions run on spawned tasks.

use crate::error::{ContainerError, Result, StartError};
use crate::event::{ContainerEvent, EventKind};
use crate::inject::Injector;
use crate::mode::Mode;
use crate::name::ServiceName;
use crate::service::{Service, ServiceState, ServiceValue, StartContext, StopContext};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Container tuning knobs.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Capacity of the lifecycle event channel. Subscribers that fall more
    /// than this many events behind see a lag error and must re-read state.
    pub event_capacity: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
        }
    }
}

struct Dependency {
    name: ServiceName,
    injector: Option<Arc<dyn Injector>>,
}

struct ServiceEntry {
    service: Arc<dyn Service>,
    mode: Mode,
    state: ServiceState,
    deps: Vec<Dependency>,
    parent: Option<ServiceName>,
    children: HashSet<ServiceName>,
    value: Option<ServiceValue>,
    failure: Option<Arc<StartError>>,
    /// Latched once the service is on its way to being unregistered, either
    /// by its own mode or because an ancestor is going away.
    leaving: bool,
}

struct ContainerState {
    services: HashMap<ServiceName, ServiceEntry>,
    /// Name -> services that declared a dependency on it. Kept for names
    /// that are not registered yet, so installs can depend on future
    /// services.
    dependents: HashMap<ServiceName, HashSet<ServiceName>>,
}

struct ContainerInner {
    state: Mutex<ContainerState>,
    events: broadcast::Sender<ContainerEvent>,
}

enum Action {
    Start(ServiceName),
    Stop(ServiceName),
    Finalize(ServiceName),
}

/// Handle to a running service container. Clones share the container.
#[derive(Clone)]
pub struct ServiceContainer {
    inner: Arc<ContainerInner>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            inner: Arc::new(ContainerInner {
                state: Mutex::new(ContainerState {
                    services: HashMap::new(),
                    dependents: HashMap::new(),
                }),
                events,
            }),
        }
    }

    /// Target for installing services at the container root.
    pub fn target(&self) -> ServiceTarget {
        ServiceTarget {
            container: self.clone(),
            parent: None,
        }
    }

    pub(crate) fn child_target(&self, parent: ServiceName) -> ServiceTarget {
        ServiceTarget {
            container: self.clone(),
            parent: Some(parent),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ContainerEvent> {
        self.inner.events.subscribe()
    }

    /// A weak, read-only view of this container.
    pub fn registry(&self) -> ServiceRegistry {
        ServiceRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn is_registered(&self, name: &ServiceName) -> bool {
        self.inner.state.lock().services.contains_key(name)
    }

    pub fn service_state(&self, name: &ServiceName) -> Option<ServiceState> {
        self.inner.state.lock().services.get(name).map(|e| e.state)
    }

    pub fn service_mode(&self, name: &ServiceName) -> Option<Mode> {
        self.inner.state.lock().services.get(name).map(|e| e.mode)
    }

    /// The value a service exposes, while it is up.
    pub fn value_of(&self, name: &ServiceName) -> Option<ServiceValue> {
        self.inner
            .state
            .lock()
            .services
            .get(name)
            .and_then(|e| e.value.clone())
    }

    /// The retained error of a service whose start failed.
    pub fn failure(&self, name: &ServiceName) -> Option<Arc<StartError>> {
        self.inner
            .state
            .lock()
            .services
            .get(name)
            .and_then(|e| e.failure.clone())
    }

    /// Any retained start failure at or below `prefix` in the name
    /// hierarchy.
    pub fn find_failure_under(
        &self,
        prefix: &ServiceName,
    ) -> Option<(ServiceName, Arc<StartError>)> {
        let state = self.inner.state.lock();
        state.services.iter().find_map(|(name, entry)| {
            if name != prefix && !prefix.is_parent_of(name) {
                return None;
            }
            entry.failure.clone().map(|err| (name.clone(), err))
        })
    }

    /// Change a service's mode, triggering whatever transitions the new mode
    /// calls for.
    pub fn set_mode(&self, name: &ServiceName, mode: Mode) -> Result<()> {
        let mut state = self.inner.state.lock();
        match state.services.get_mut(name) {
            Some(entry) => entry.mode = mode,
            None => return Err(ContainerError::ServiceNotFound(name.clone())),
        }
        self.kick(&mut state);
        Ok(())
    }

    /// Wait until `name` is no longer registered.
    pub async fn await_removal(&self, name: &ServiceName) {
        let mut rx = self.subscribe();
        loop {
            if !self.is_registered(name) {
                return;
            }
            match rx.recv().await {
                Ok(event) => {
                    if event.service == *name && event.kind == EventKind::Removed {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    /// Wait until `name` reaches the up state, or fails to start.
    ///
    /// The name does not have to be registered yet; installation is awaited
    /// along with the start.
    pub async fn await_up(&self, name: &ServiceName) -> std::result::Result<(), Arc<StartError>> {
        let mut rx = self.subscribe();
        loop {
            match self.service_state(name) {
                Some(ServiceState::Up) => return Ok(()),
                Some(ServiceState::StartFailed) => {
                    let err = self
                        .failure(name)
                        .unwrap_or_else(|| Arc::new(StartError::new(format!("{name} failed"))));
                    return Err(err);
                }
                _ => {}
            }
            match rx.recv().await {
                Ok(event) if event.service == *name => continue,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(Arc::new(StartError::new("service container shut down")));
                }
            }
        }
    }

    fn emit(&self, event: ContainerEvent) {
        let _ = self.inner.events.send(event);
    }

    fn install(
        &self,
        parent: Option<ServiceName>,
        name: ServiceName,
        service: Arc<dyn Service>,
        deps: Vec<Dependency>,
        mode: Mode,
    ) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.services.contains_key(&name) {
            return Err(ContainerError::DuplicateService(name));
        }
        if let Some(parent_name) = &parent {
            let parent_entry = state
                .services
                .get_mut(parent_name)
                .ok_or_else(|| ContainerError::ServiceNotFound(parent_name.clone()))?;
            // no new children once the parent is on its way out
            if parent_entry.leaving
                || matches!(
                    parent_entry.state,
                    ServiceState::Stopping | ServiceState::StartFailed
                )
            {
                return Err(ContainerError::ParentRemoved(parent_name.clone()));
            }
            parent_entry.children.insert(name.clone());
        }
        for dep in &deps {
            state
                .dependents
                .entry(dep.name.clone())
                .or_default()
                .insert(name.clone());
        }
        debug!(service = %name, mode = %mode, "Installing service");
        state.services.insert(
            name.clone(),
            ServiceEntry {
                service,
                mode,
                state: ServiceState::Down,
                deps,
                parent,
                children: HashSet::new(),
                value: None,
                failure: None,
                leaving: false,
            },
        );
        self.emit(ContainerEvent::now(name, EventKind::Installed));
        self.kick(&mut state);
        Ok(())
    }

    /// Re-evaluate the graph until no further transition applies.
    fn kick(&self, state: &mut ContainerState) {
        loop {
            Self::latch_leaving(state);
            let stop_pressure = Self::compute_stop_pressure(state);

            let mut actions: Vec<Action> = Vec::new();
            for (name, entry) in &state.services {
                match entry.state {
                    ServiceState::Down => {
                        if entry.leaving {
                            if entry.children.is_empty() {
                                actions.push(Action::Finalize(name.clone()));
                            }
                        } else if Self::can_start(state, name, entry, &stop_pressure) {
                            actions.push(Action::Start(name.clone()));
                        }
                    }
                    ServiceState::StartFailed => {
                        if entry.leaving && entry.children.is_empty() {
                            actions.push(Action::Finalize(name.clone()));
                        }
                    }
                    ServiceState::Up => {
                        if stop_pressure.contains(name) && Self::dependents_are_down(state, name) {
                            actions.push(Action::Stop(name.clone()));
                        }
                    }
                    _ => {}
                }
            }
            if actions.is_empty() {
                break;
            }
            for action in actions {
                match action {
                    Action::Start(name) => self.begin_start(state, name),
                    Action::Stop(name) => self.begin_stop(state, name),
                    Action::Finalize(name) => self.finalize_removal(state, name),
                }
            }
        }
    }

    /// Latch the leaving flag: from the service's own mode, or inherited
    /// from a parent that is leaving, stopping, or failed.
    fn latch_leaving(state: &mut ContainerState) {
        loop {
            let mut to_latch: Vec<ServiceName> = Vec::new();
            for (name, entry) in &state.services {
                if entry.leaving {
                    continue;
                }
                let latch = entry.mode == Mode::Remove
                    || match &entry.parent {
                        Some(parent) => match state.services.get(parent) {
                            Some(p) => {
                                p.leaving
                                    || matches!(
                                        p.state,
                                        ServiceState::Stopping | ServiceState::StartFailed
                                    )
                            }
                            None => true,
                        },
                        None => false,
                    };
                if latch {
                    to_latch.push(name.clone());
                }
            }
            if to_latch.is_empty() {
                return;
            }
            for name in to_latch {
                if let Some(entry) = state.services.get_mut(&name) {
                    entry.leaving = true;
                }
            }
        }
    }

    /// The set of up services that have to leave the up state: seeded by
    /// mode and the leaving flag, then propagated through dependency edges
    /// so dependents come down before the services they require.
    fn compute_stop_pressure(state: &ContainerState) -> HashSet<ServiceName> {
        let mut pressure: HashSet<ServiceName> = HashSet::new();
        for (name, entry) in &state.services {
            if entry.state != ServiceState::Up {
                continue;
            }
            let lazy_undemanded = entry.mode == Mode::Lazy && !Self::demanded(state, name);
            if !entry.mode.allows_start() || entry.leaving || lazy_undemanded {
                pressure.insert(name.clone());
            }
        }
        loop {
            let mut changed = false;
            for (name, entry) in &state.services {
                if entry.state != ServiceState::Up || pressure.contains(name) {
                    continue;
                }
                let must_leave = entry.deps.iter().any(|dep| {
                    pressure.contains(&dep.name)
                        || match state.services.get(&dep.name) {
                            Some(d) => d.state != ServiceState::Up || d.leaving,
                            None => true,
                        }
                });
                if must_leave {
                    pressure.insert(name.clone());
                    changed = true;
                }
            }
            if !changed {
                return pressure;
            }
        }
    }

    fn demanded(state: &ContainerState, name: &ServiceName) -> bool {
        state.dependents.get(name).is_some_and(|dependents| {
            dependents.iter().any(|d| {
                state
                    .services
                    .get(d)
                    .is_some_and(|e| e.mode == Mode::Active && !e.leaving)
            })
        })
    }

    fn can_start(
        state: &ContainerState,
        name: &ServiceName,
        entry: &ServiceEntry,
        stop_pressure: &HashSet<ServiceName>,
    ) -> bool {
        if !entry.mode.allows_start() {
            return false;
        }
        if entry.mode == Mode::Lazy && !Self::demanded(state, name) {
            return false;
        }
        entry.deps.iter().all(|dep| {
            !stop_pressure.contains(&dep.name)
                && state
                    .services
                    .get(&dep.name)
                    .is_some_and(|d| d.state == ServiceState::Up && !d.leaving)
        })
    }

    fn dependents_are_down(state: &ContainerState, name: &ServiceName) -> bool {
        state.dependents.get(name).map_or(true, |dependents| {
            dependents.iter().all(|d| match state.services.get(d) {
                Some(e) => !matches!(
                    e.state,
                    ServiceState::Starting | ServiceState::Up | ServiceState::Stopping
                ),
                None => true,
            })
        })
    }

    fn begin_start(&self, state: &mut ContainerState, name: ServiceName) {
        // resolve injections from dependency values before flipping state
        let mut injections: Vec<(Arc<dyn Injector>, ServiceValue)> = Vec::new();
        let mut valueless_dep: Option<ServiceName> = None;
        if let Some(entry) = state.services.get(&name) {
            for dep in &entry.deps {
                let Some(injector) = &dep.injector else {
                    continue;
                };
                match state.services.get(&dep.name).and_then(|d| d.value.clone()) {
                    Some(value) => injections.push((injector.clone(), value)),
                    None => {
                        valueless_dep = Some(dep.name.clone());
                        break;
                    }
                }
            }
        }
        let Some(entry) = state.services.get_mut(&name) else {
            return;
        };
        if let Some(dep_name) = valueless_dep {
            let err = Arc::new(StartError::new(format!(
                "required dependency {dep_name} provides no value"
            )));
            entry.state = ServiceState::StartFailed;
            entry.failure = Some(err.clone());
            warn!(service = %name, error = %err, "Service start failed");
            self.emit(ContainerEvent::now(
                name,
                EventKind::StartFailed {
                    message: err.to_string(),
                },
            ));
            return;
        }
        entry.state = ServiceState::Starting;
        let service = entry.service.clone();
        self.emit(ContainerEvent::now(name.clone(), EventKind::Starting));

        let container = self.clone();
        tokio::spawn(async move {
            for (injector, value) in &injections {
                if let Err(err) = injector.inject(value.clone()) {
                    let err =
                        StartError::with_cause(format!("failed to inject value into {name}"), err);
                    container.complete_start(&name, Err(err));
                    return;
                }
            }
            let ctx = StartContext::new(name.clone(), container.clone());
            let result = service.start(&ctx).await;
            container.complete_start(&name, result);
        });
    }

    fn begin_stop(&self, state: &mut ContainerState, name: ServiceName) {
        let Some(entry) = state.services.get_mut(&name) else {
            return;
        };
        entry.state = ServiceState::Stopping;
        let service = entry.service.clone();
        self.emit(ContainerEvent::now(name.clone(), EventKind::Stopping));

        let container = self.clone();
        tokio::spawn(async move {
            let ctx = StopContext::new(name.clone(), container.clone());
            service.stop(&ctx).await;
            container.complete_stop(&name);
        });
    }

    fn complete_start(&self, name: &ServiceName, result: std::result::Result<(), StartError>) {
        let mut state = self.inner.state.lock();
        {
            let Some(entry) = state.services.get_mut(name) else {
                return;
            };
            match result {
                Ok(()) => {
                    entry.value = entry.service.value();
                    entry.state = ServiceState::Up;
                    debug!(service = %name, "Service started");
                    self.emit(ContainerEvent::now(name.clone(), EventKind::Started));
                }
                Err(err) => {
                    let err = Arc::new(err);
                    entry.state = ServiceState::StartFailed;
                    entry.failure = Some(err.clone());
                    for dep in &entry.deps {
                        if let Some(injector) = &dep.injector {
                            injector.uninject();
                        }
                    }
                    warn!(service = %name, error = %err, "Service start failed");
                    self.emit(ContainerEvent::now(
                        name.clone(),
                        EventKind::StartFailed {
                            message: err.to_string(),
                        },
                    ));
                }
            }
        }
        self.kick(&mut state);
    }

    fn complete_stop(&self, name: &ServiceName) {
        let mut state = self.inner.state.lock();
        {
            let Some(entry) = state.services.get_mut(name) else {
                return;
            };
            entry.state = ServiceState::Down;
            entry.value = None;
            for dep in &entry.deps {
                if let Some(injector) = &dep.injector {
                    injector.uninject();
                }
            }
            debug!(service = %name, "Service stopped");
            self.emit(ContainerEvent::now(name.clone(), EventKind::Stopped));
        }
        self.kick(&mut state);
    }

    fn finalize_removal(&self, state: &mut ContainerState, name: ServiceName) {
        let Some(entry) = state.services.remove(&name) else {
            return;
        };
        for dep in &entry.deps {
            let emptied = match state.dependents.get_mut(&dep.name) {
                Some(set) => {
                    set.remove(&name);
                    set.is_empty()
                }
                None => false,
            };
            if emptied {
                state.dependents.remove(&dep.name);
            }
        }
        if let Some(parent) = &entry.parent {
            if let Some(parent_entry) = state.services.get_mut(parent) {
                parent_entry.children.remove(&name);
            }
        }
        debug!(service = %name, "Service removed");
        self.emit(ContainerEvent::now(name, EventKind::Removed));
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a service gets installed: at the container root, or as the child of
/// a running service (bounding its lifetime by that service's).
#[derive(Clone)]
pub struct ServiceTarget {
    container: ServiceContainer,
    parent: Option<ServiceName>,
}

impl ServiceTarget {
    pub fn add_service(&self, name: ServiceName, service: Arc<dyn Service>) -> ServiceBuilder {
        ServiceBuilder {
            container: self.container.clone(),
            parent: self.parent.clone(),
            name,
            service,
            deps: Vec::new(),
            mode: Mode::Active,
        }
    }

    pub fn container(&self) -> &ServiceContainer {
        &self.container
    }
}

/// Collects a service's dependencies and mode before installation.
pub struct ServiceBuilder {
    container: ServiceContainer,
    parent: Option<ServiceName>,
    name: ServiceName,
    service: Arc<dyn Service>,
    deps: Vec<Dependency>,
    mode: Mode,
}

impl ServiceBuilder {
    /// Require `name` to be up before this service starts. Requiring the
    /// same name twice records a single edge.
    pub fn requires(mut self, name: ServiceName) -> Self {
        if !self.deps.iter().any(|d| d.name == name) {
            self.deps.push(Dependency {
                name,
                injector: None,
            });
        }
        self
    }

    /// Require `name` and feed its exposed value through `injector` before
    /// this service starts. Multiple injectors may target one dependency.
    pub fn requires_value(mut self, name: ServiceName, injector: Arc<dyn Injector>) -> Self {
        self.deps.push(Dependency {
            name,
            injector: Some(injector),
        });
        self
    }

    pub fn initial_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn install(self) -> Result<()> {
        self.container
            .install(self.parent, self.name, self.service, self.deps, self.mode)
    }
}

/// A weak, read-only lookup view of a container.
///
/// Held by long-lived domain objects that must not keep the container alive
/// on their own.
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Weak<ContainerInner>,
}

impl ServiceRegistry {
    pub fn is_registered(&self, name: &ServiceName) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.state.lock().services.contains_key(name))
    }

    pub fn service_state(&self, name: &ServiceName) -> Option<ServiceState> {
        self.inner
            .upgrade()
            .and_then(|inner| inner.state.lock().services.get(name).map(|e| e.state))
    }

    /// The value a service exposes, while it is up.
    pub fn value_of(&self, name: &ServiceName) -> Option<ServiceValue> {
        self.inner
            .upgrade()
            .and_then(|inner| inner.state.lock().services.get(name).and_then(|e| e.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ValueService;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::timeout;

    struct RecordingService {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingService {
        fn new(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                label,
                log,
                fail: false,
            })
        }

        fn failing(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                label,
                log,
                fail: true,
            })
        }
    }

    #[async_trait]
    impl Service for RecordingService {
        async fn start(&self, _ctx: &StartContext) -> std::result::Result<(), StartError> {
            if self.fail {
                return Err(StartError::new(format!("{} refused", self.label)));
            }
            self.log.lock().push(format!("start:{}", self.label));
            Ok(())
        }

        async fn stop(&self, _ctx: &StopContext) {
            self.log.lock().push(format!("stop:{}", self.label));
        }
    }

    /// Installs one child service during its own start.
    struct NestingService;

    #[async_trait]
    impl Service for NestingService {
        async fn start(&self, ctx: &StartContext) -> std::result::Result<(), StartError> {
            ctx.child_target()
                .add_service(
                    ctx.service_name().append("inner"),
                    Arc::new(ValueService::new(1_u32)),
                )
                .install()
                .map_err(|e| StartError::with_cause("failed to install child", e))?;
            Ok(())
        }

        async fn stop(&self, _ctx: &StopContext) {}
    }

    fn log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn value_service_starts_and_exposes_its_value() {
        let container = ServiceContainer::new();
        let name = ServiceName::of("config");
        container
            .target()
            .add_service(name.clone(), Arc::new(ValueService::new(42_u32)))
            .install()
            .expect("install should succeed");

        container.await_up(&name).await.expect("service should start");
        let value = container.value_of(&name).expect("value should be exposed");
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));
    }

    #[tokio::test]
    async fn dependency_orders_start_and_stop() {
        let container = ServiceContainer::new();
        let log = log();
        let a = ServiceName::of("a");
        let b = ServiceName::of("b");

        // install the dependent first so the edge predates the dependency
        container
            .target()
            .add_service(a.clone(), RecordingService::new("a", log.clone()))
            .requires(b.clone())
            .install()
            .expect("install a");
        container
            .target()
            .add_service(b.clone(), RecordingService::new("b", log.clone()))
            .install()
            .expect("install b");

        container.await_up(&a).await.expect("a should start");
        assert_eq!(log.lock().as_slice(), ["start:b", "start:a"]);

        container.set_mode(&b, Mode::Never).expect("mode change");
        timeout(Duration::from_secs(5), async {
            loop {
                if container.service_state(&b) == Some(ServiceState::Down)
                    && container.service_state(&a) == Some(ServiceState::Down)
                {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("both should come down");
        assert_eq!(
            log.lock().as_slice(),
            ["start:b", "start:a", "stop:a", "stop:b"]
        );
    }

    #[tokio::test]
    async fn remove_unregisters_children_installed_through_child_targets() {
        let container = ServiceContainer::new();
        let outer = ServiceName::of("outer");
        container
            .target()
            .add_service(outer.clone(), Arc::new(NestingService))
            .install()
            .expect("install outer");

        let inner = outer.append("inner");
        container.await_up(&inner).await.expect("inner should start");

        container.set_mode(&outer, Mode::Remove).expect("mode change");
        timeout(Duration::from_secs(5), container.await_removal(&outer))
            .await
            .expect("outer should be removed");
        assert!(!container.is_registered(&inner));
    }

    #[tokio::test]
    async fn failed_start_is_retained_and_blocks_dependents() {
        let container = ServiceContainer::new();
        let log = log();
        let bad = ServiceName::of("bad");
        let dependent = ServiceName::of("dependent");

        container
            .target()
            .add_service(bad.clone(), RecordingService::failing("bad", log.clone()))
            .install()
            .expect("install bad");
        container
            .target()
            .add_service(
                dependent.clone(),
                RecordingService::new("dependent", log.clone()),
            )
            .requires(bad.clone())
            .install()
            .expect("install dependent");

        let err = container.await_up(&bad).await.expect_err("start must fail");
        assert!(err.to_string().contains("bad refused"));
        assert_eq!(container.service_state(&bad), Some(ServiceState::StartFailed));
        assert_eq!(container.service_state(&dependent), Some(ServiceState::Down));
        assert!(log.lock().iter().all(|l| l != "start:dependent"));

        let (failed, _) = container
            .find_failure_under(&bad)
            .expect("failure should be reported");
        assert_eq!(failed, bad);
    }

    #[tokio::test]
    async fn lazy_service_starts_only_when_demanded() {
        let container = ServiceContainer::new();
        let log = log();
        let lazy = ServiceName::of("lazy");

        container
            .target()
            .add_service(lazy.clone(), RecordingService::new("lazy", log.clone()))
            .initial_mode(Mode::Lazy)
            .install()
            .expect("install lazy");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(container.service_state(&lazy), Some(ServiceState::Down));

        let demander = ServiceName::of("demander");
        container
            .target()
            .add_service(
                demander.clone(),
                RecordingService::new("demander", log.clone()),
            )
            .requires(lazy.clone())
            .install()
            .expect("install demander");

        container.await_up(&demander).await.expect("demand starts lazy");
        assert_eq!(container.service_state(&lazy), Some(ServiceState::Up));
    }

    #[tokio::test]
    async fn never_mode_holds_a_service_down() {
        let container = ServiceContainer::new();
        let log = log();
        let held = ServiceName::of("held");
        container
            .target()
            .add_service(held.clone(), RecordingService::new("held", log.clone()))
            .initial_mode(Mode::Never)
            .install()
            .expect("install");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(container.service_state(&held), Some(ServiceState::Down));

        container.set_mode(&held, Mode::Active).expect("mode change");
        container.await_up(&held).await.expect("released service starts");
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let container = ServiceContainer::new();
        let name = ServiceName::of("once");
        container
            .target()
            .add_service(name.clone(), Arc::new(ValueService::new(())))
            .install()
            .expect("first install");
        let err = container
            .target()
            .add_service(name.clone(), Arc::new(ValueService::new(())))
            .install()
            .expect_err("second install must fail");
        assert!(matches!(err, ContainerError::DuplicateService(n) if n == name));
    }

    #[tokio::test]
    async fn registry_view_does_not_keep_the_container_alive() {
        let container = ServiceContainer::new();
        let name = ServiceName::of("transient");
        container
            .target()
            .add_service(name.clone(), Arc::new(ValueService::new(7_u32)))
            .install()
            .expect("install");
        container.await_up(&name).await.expect("start");

        let registry = container.registry();
        assert!(registry.is_registered(&name));
        drop(container);
        assert!(!registry.is_registered(&name));
        assert!(registry.value_of(&name).is_none());
    }
}
