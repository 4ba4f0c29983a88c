//! Shared fixtures for deployment pipeline tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use gantry_content::{ContentRepository, FsContentRepository};
use gantry_deployment::{
    DeployerChains, DeploymentManager, DeploymentPhaseContext, DeploymentPlan, DeploymentUnit,
    DeploymentUnitProcessingError, DeploymentUnitProcessor,
};
use gantry_services::{ServiceContainer, ServiceName};

/// Collects pipeline events from processors running across tasks.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events.lock().iter().any(|e| e == event)
    }

    /// Index of `event`, panicking with the full log when absent.
    pub fn index_of(&self, event: &str) -> usize {
        let events = self.events.lock();
        match events.iter().position(|e| e == event) {
            Some(index) => index,
            None => panic!("event {event:?} not recorded; log: {events:?}"),
        }
    }
}

/// A processor that records every call, optionally failing `deploy` for one
/// named unit.
pub struct RecordingProcessor {
    name: String,
    recorder: Arc<Recorder>,
    fail_for: Option<String>,
}

impl RecordingProcessor {
    pub fn new(name: impl Into<String>, recorder: &Arc<Recorder>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            recorder: recorder.clone(),
            fail_for: None,
        })
    }

    pub fn failing_for(
        name: impl Into<String>,
        recorder: &Arc<Recorder>,
        unit: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            recorder: recorder.clone(),
            fail_for: Some(unit.into()),
        })
    }
}

#[async_trait]
impl DeploymentUnitProcessor for RecordingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deploy(
        &self,
        context: &DeploymentPhaseContext,
    ) -> Result<(), DeploymentUnitProcessingError> {
        let unit = context.deployment_unit();
        self.recorder
            .push(format!("deploy:{}:{}", self.name, unit.name()));
        if self.fail_for.as_deref() == Some(unit.name()) {
            return Err(DeploymentUnitProcessingError::new(format!(
                "{} rejected {}: boom",
                self.name,
                unit.name()
            )));
        }
        Ok(())
    }

    async fn undeploy(
        &self,
        unit: &DeploymentUnit,
    ) -> Result<(), DeploymentUnitProcessingError> {
        self.recorder
            .push(format!("undeploy:{}:{}", self.name, unit.name()));
        Ok(())
    }
}

/// Manager, content store, and the tempdir backing them, for one test.
pub struct Fixture {
    pub manager: DeploymentManager,
    pub content: Arc<FsContentRepository>,
    _dir: TempDir,
}

impl Fixture {
    pub fn new(chains: DeployerChains) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let content = Arc::new(FsContentRepository::new(dir.path()));
        let manager = DeploymentManager::new(ServiceContainer::new(), content.clone(), chains)
            .expect("manager should initialize");
        Self {
            manager,
            content,
            _dir: dir,
        }
    }

    /// Store `blob` and deploy it under `name`.
    pub async fn deploy(&self, name: &str, blob: &[u8]) -> ServiceName {
        let hash = self
            .content
            .add_content(blob.to_vec())
            .await
            .expect("content should store");
        self.manager
            .deploy(DeploymentPlan::new(name, hash))
            .await
            .expect("deploy should be accepted")
    }
}

/// Await `future` with a hard cap, so a wedged pipeline fails the test
/// instead of hanging it.
pub async fn within<T>(what: &str, future: impl std::future::Future<Output = T>) -> T {
    match tokio::time::timeout(Duration::from_secs(10), future).await {
        Ok(value) => value,
        Err(_) => panic!("timed out waiting for {what}"),
    }
}
