//! In-memory collaborators for orchestration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use shipyard_core::client::{
    ChangeStep, ClusterApi, ClusterConnector, DeployPayload, DeploymentRequest,
    MigrationDescriptor, MigrationStatus, MigrationStatusSnapshot, Project,
};
use shipyard_core::cluster::{Cluster, ClusterEnvironment, ProjectIdentity};
use shipyard_core::definition::{DEFINITION_FILE, SeedConfig, ServiceDefinition};
use shipyard_core::deploy::{
    Authenticator, ClientGenerator, EndpointDialog, GenerateRequest, PollOptions,
    ResolvedEndpoint, Seeder,
};
use shipyard_core::error::DeployError;
use shipyard_core::process::{ProcessOutcome, ProcessRunner};

// ============================================================================
// Cluster
// ============================================================================

/// Shared state behind every client a [`FakeConnector`] hands out.
#[derive(Default)]
pub struct ClusterState {
    pub payload: Mutex<DeployPayload>,
    pub snapshots: Mutex<VecDeque<MigrationStatusSnapshot>>,
    pub project_exists: AtomicBool,
    pub offline: AtomicBool,
    pub version: Mutex<Option<String>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub requests: Mutex<Vec<DeploymentRequest>>,
    pub added: Mutex<Vec<(ProjectIdentity, Option<Vec<String>>)>>,
    pub imported: Mutex<Vec<Value>>,
    pub connected: Mutex<Vec<Cluster>>,
    pub reachability_checks: Mutex<Vec<Cluster>>,
}

impl ClusterState {
    pub fn new() -> Arc<Self> {
        let state = Self::default();
        state.project_exists.store(true, Ordering::SeqCst);
        Arc::new(state)
    }

    pub fn with_payload(self: Arc<Self>, payload: DeployPayload) -> Arc<Self> {
        *self.payload.lock().unwrap() = payload;
        self
    }

    /// Snapshots returned by successive fetches; the last one repeats.
    pub fn with_snapshots(self: Arc<Self>, snapshots: Vec<MigrationStatusSnapshot>) -> Arc<Self> {
        *self.snapshots.lock().unwrap() = snapshots.into();
        self
    }

    pub fn with_new_project(self: Arc<Self>) -> Arc<Self> {
        self.project_exists.store(false, Ordering::SeqCst);
        self
    }

    pub fn with_version(self: Arc<Self>, version: &str) -> Arc<Self> {
        *self.version.lock().unwrap() = Some(version.to_string());
        self
    }

    pub fn offline(self: Arc<Self>) -> Arc<Self> {
        self.offline.store(true, Ordering::SeqCst);
        self
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct FakeCluster {
    state: Arc<ClusterState>,
}

impl FakeCluster {
    pub fn new(state: Arc<ClusterState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeployPayload, DeployError> {
        self.state.record("deploy");
        self.state.requests.lock().unwrap().push(request.clone());
        Ok(self.state.payload.lock().unwrap().clone())
    }

    async fn get_migration(
        &self,
        _identity: &ProjectIdentity,
    ) -> Result<MigrationStatusSnapshot, DeployError> {
        self.state.record("get_migration");
        let mut snapshots = self.state.snapshots.lock().unwrap();
        match snapshots.len() {
            0 => Err(DeployError::Graphql("No migration".to_string())),
            1 => Ok(snapshots[0].clone()),
            _ => Ok(snapshots.pop_front().unwrap()),
        }
    }

    async fn get_project(&self, identity: &ProjectIdentity) -> Result<Project, DeployError> {
        self.state.record("get_project");
        if self.state.project_exists.load(Ordering::SeqCst) {
            Ok(Project {
                name: identity.name.clone(),
                stage: identity.stage.clone(),
            })
        } else {
            Err(DeployError::Graphql(format!("Project {} not found", identity)))
        }
    }

    async fn add_project(
        &self,
        identity: &ProjectIdentity,
        secrets: Option<&[String]>,
    ) -> Result<Project, DeployError> {
        self.state.record("add_project");
        self.state
            .added
            .lock()
            .unwrap()
            .push((identity.clone(), secrets.map(<[String]>::to_vec)));
        self.state.project_exists.store(true, Ordering::SeqCst);
        Ok(Project {
            name: identity.name.clone(),
            stage: identity.stage.clone(),
        })
    }

    async fn server_version(&self) -> Result<Option<String>, DeployError> {
        self.state.record("server_version");
        Ok(self.state.version.lock().unwrap().clone())
    }

    async fn import_data(
        &self,
        _identity: &ProjectIdentity,
        data: &Value,
    ) -> Result<(), DeployError> {
        self.state.record("import_data");
        self.state.imported.lock().unwrap().push(data.clone());
        Ok(())
    }
}

pub struct FakeConnector {
    pub state: Arc<ClusterState>,
}

impl FakeConnector {
    pub fn new(state: Arc<ClusterState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ClusterConnector for FakeConnector {
    async fn is_online(&self, cluster: &Cluster) -> bool {
        self.state.reachability_checks.lock().unwrap().push(cluster.clone());
        !self.state.offline.load(Ordering::SeqCst)
    }

    fn connect(&self, cluster: &Cluster) -> Result<Box<dyn ClusterApi>, DeployError> {
        self.state.connected.lock().unwrap().push(cluster.clone());
        Ok(Box::new(FakeCluster::new(self.state.clone())))
    }
}

// ============================================================================
// Processes, generator, seeder
// ============================================================================

/// Records invocations; programs without a configured outcome succeed.
#[derive(Default)]
pub struct FakeRunner {
    pub invocations: Mutex<Vec<(String, Vec<String>)>>,
    pub outcomes: HashMap<String, ProcessOutcome>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, program: &str, outcome: ProcessOutcome) -> Self {
        self.outcomes.insert(program.to_string(), outcome);
        self
    }

    pub fn programs(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|(program, _)| program.clone())
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String]) -> ProcessOutcome {
        self.invocations
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        self.outcomes.get(program).cloned().unwrap_or(ProcessOutcome {
            status: Some(0),
            ..Default::default()
        })
    }
}

pub fn failed(stderr: &str) -> ProcessOutcome {
    ProcessOutcome {
        status: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
        error: None,
    }
}

#[derive(Default)]
pub struct FakeGenerator {
    pub calls: AtomicUsize,
}

impl ClientGenerator for FakeGenerator {
    fn generate(&self, _request: &GenerateRequest<'_>) -> Result<Vec<PathBuf>, DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct FakeSeeder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Seeder for FakeSeeder {
    async fn seed(
        &self,
        _api: &dyn ClusterApi,
        _identity: &ProjectIdentity,
        _seed: &SeedConfig,
    ) -> Result<(), DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Dialog and login
// ============================================================================

pub struct FakeDialog {
    pub answer: Option<ResolvedEndpoint>,
    pub calls: AtomicUsize,
}

impl FakeDialog {
    /// A dialog that must not be shown.
    pub fn unused() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn answering(answer: ResolvedEndpoint) -> Self {
        Self {
            answer: Some(answer),
            calls: AtomicUsize::new(0),
        }
    }
}

impl EndpointDialog for FakeDialog {
    fn select(
        &self,
        _env: &ClusterEnvironment,
        _definition: &ServiceDefinition,
    ) -> Result<ResolvedEndpoint, DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| DeployError::Configuration("dialog was not expected".to_string()))
    }
}

#[derive(Default)]
pub struct FakeAuthenticator {
    pub calls: AtomicUsize,
}

impl Authenticator for FakeAuthenticator {
    fn login(&self, _env: &ClusterEnvironment) -> Result<String, DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("session-from-login".to_string())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub const LOCAL_ENDPOINT: &str = "http://localhost:4466/blog/dev";

/// Write a datamodel and a definition file; `extra` is appended verbatim.
pub fn write_project(dir: &Path, endpoint: Option<&str>, extra: &str) -> PathBuf {
    std::fs::write(dir.join("datamodel.graphql"), "type User { id: ID! @id }").unwrap();
    let mut content = String::new();
    if let Some(endpoint) = endpoint {
        content.push_str(&format!("endpoint = \"{}\"\n", endpoint));
    }
    content.push_str("datamodel = \"datamodel.graphql\"\n");
    content.push_str(extra);
    let path = dir.join(DEFINITION_FILE);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn empty_env(dir: &Path) -> ClusterEnvironment {
    ClusterEnvironment::from_path(dir.join("global").join("config.toml")).unwrap()
}

pub fn fast_poll() -> PollOptions {
    PollOptions::default().with_interval(Duration::from_millis(1))
}

pub fn step(name: &str) -> ChangeStep {
    ChangeStep {
        kind: "CreateModel".to_string(),
        name: name.to_string(),
        model: None,
    }
}

/// A payload carrying a real migration of `steps` steps.
pub fn migration_payload(revision: i64, steps: usize) -> DeployPayload {
    DeployPayload {
        migration: Some(MigrationDescriptor {
            revision,
            steps: (0..steps).map(|i| step(&format!("Model{}", i))).collect(),
        }),
        ..Default::default()
    }
}

pub fn snapshot(applied: u32, status: MigrationStatus) -> MigrationStatusSnapshot {
    MigrationStatusSnapshot {
        applied,
        status,
        errors: Vec::new(),
    }
}
