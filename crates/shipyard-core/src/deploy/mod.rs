//! Deploy orchestration: target resolution, submission, migration polling,
//! hooks, client generation, seeding and endpoint reporting.

pub mod endpoints;
pub mod generate;
pub mod hooks;
pub mod orchestrator;
pub mod poller;
pub mod report;
pub mod seed;
pub mod target;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::ChangeStep;
use crate::cluster::{Cluster, ProjectIdentity};
use crate::definition::DefinitionStore;
use crate::error::DeployError;

pub use endpoints::{ServiceEndpoints, report_endpoints, service_endpoints};
pub use generate::{ArtifactGenerator, ClientGenerator, GenerateRequest, GenerationTrigger};
pub use hooks::{HookReport, HookRunner};
pub use orchestrator::DeployCommand;
pub use poller::{MigrationPoller, PollOptions};
pub use report::{Verdict, classify, report_payload};
pub use seed::{DefinitionSeeder, Seeder, invoke_seeder, should_seed};
pub use target::{Authenticator, EndpointDialog, ResolvedEndpoint, ResolvedTarget, resolve_target};

/// Flags of a deploy run.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub force: bool,
    /// Always ask for the target, even if the definition names one
    pub interactive: bool,
    pub dry_run: bool,
    pub no_seed: bool,
    pub no_migrate: bool,
    pub no_generate: bool,
    pub skip_hooks: bool,
    pub poll: PollOptions,
}

impl DeployOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_no_seed(mut self, no_seed: bool) -> Self {
        self.no_seed = no_seed;
        self
    }

    pub fn with_no_migrate(mut self, no_migrate: bool) -> Self {
        self.no_migrate = no_migrate;
        self
    }

    pub fn with_no_generate(mut self, no_generate: bool) -> Self {
        self.no_generate = no_generate;
        self
    }

    pub fn with_skip_hooks(mut self, skip_hooks: bool) -> Self {
        self.skip_hooks = skip_hooks;
        self
    }

    pub fn with_poll(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    /// Bound migration polling; `None` waits forever.
    pub fn with_migration_timeout(mut self, max_wait: Option<Duration>) -> Self {
        self.poll = self.poll.with_max_wait(max_wait);
        self
    }
}

/// Immutable state of one run, fixed before the deployment is submitted.
#[derive(Debug, Clone)]
pub struct DeployContext {
    pub target: ResolvedTarget,
    pub options: DeployOptions,
    /// The project was created by this run
    pub project_new: bool,
}

impl DeployContext {
    pub fn identity(&self) -> &ProjectIdentity {
        &self.target.identity
    }

    pub fn cluster(&self) -> &Cluster {
        &self.target.cluster
    }

    /// Print the `Hooks:` banner before seeding.
    pub fn show_hooks_banner(&self) -> bool {
        !self.options.skip_hooks
    }
}

/// Result of a completed deploy run, serialized as the `--json` summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    pub service: String,
    pub stage: String,
    pub cluster: String,
    pub workspace: Option<String>,
    pub dry_run: bool,
    pub project_new: bool,
    pub changes: Vec<ChangeStep>,
    pub http_endpoint: Option<String>,
    pub ws_endpoint: Option<String>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip)]
    pub hooks: Vec<HookReport>,
    #[serde(skip)]
    pub generated: bool,
    #[serde(skip)]
    pub seeded: bool,
}

/// Load the definition for a deploy run, injecting `env_file` first.
///
/// A missing env file is a configuration error, not a silent no-op.
pub fn load_definition(
    project: &Path,
    env_file: Option<&Path>,
) -> Result<DefinitionStore, DeployError> {
    if let Some(env_file) = env_file
        && !env_file.exists()
    {
        return Err(DeployError::Configuration(format!(
            "--env-file path '{}' does not exist",
            env_file.display()
        )));
    }
    if !project.exists() {
        return Err(DeployError::Configuration(format!(
            "Definition file '{}' does not exist",
            project.display()
        )));
    }
    Ok(DefinitionStore::load(project, env_file)?)
}
