//! Seeding of newly created services.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use super::DeployContext;
use crate::client::ClusterApi;
use crate::cluster::ProjectIdentity;
use crate::definition::SeedConfig;
use crate::error::DeployError;
use crate::output::{Output, Tone};
use crate::process::ProcessRunner;
use crate::util::{pretty_time, split_command};

/// Fills a freshly created project with initial data.
#[async_trait]
pub trait Seeder: Send + Sync {
    async fn seed(
        &self,
        api: &dyn ClusterApi,
        identity: &ProjectIdentity,
        seed: &SeedConfig,
    ) -> Result<(), DeployError>;
}

/// Seeds from the `[seed]` table of the definition: `import` uploads a JSON
/// document through the cluster, `run` executes a command.
pub struct DefinitionSeeder<'a> {
    runner: &'a dyn ProcessRunner,
    base_dir: PathBuf,
}

impl<'a> DefinitionSeeder<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            base_dir: base_dir.into(),
        }
    }

    async fn import(
        &self,
        api: &dyn ClusterApi,
        identity: &ProjectIdentity,
        file: &str,
    ) -> Result<(), DeployError> {
        let path = self.base_dir.join(file);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            DeployError::Seed(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let data: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            DeployError::Seed(format!("Invalid JSON in seed file {}: {}", path.display(), e))
        })?;
        api.import_data(identity, &data).await
    }

    async fn run(&self, command: &str) -> Result<(), DeployError> {
        let (program, args) = split_command(command)
            .ok_or_else(|| DeployError::Seed("Seed command is empty".to_string()))?;
        let outcome = self.runner.run(&program, &args).await;
        if outcome.success() {
            debug!("Seed command output: {}", outcome.stdout.trim_end());
            return Ok(());
        }
        let reason = outcome
            .error
            .clone()
            .or_else(|| Some(outcome.stderr.trim_end().to_string()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| format!("exit status {:?}", outcome.status));
        Err(DeployError::Seed(format!(
            "Seed command `{}` failed: {}",
            command, reason
        )))
    }
}

#[async_trait]
impl Seeder for DefinitionSeeder<'_> {
    async fn seed(
        &self,
        api: &dyn ClusterApi,
        identity: &ProjectIdentity,
        seed: &SeedConfig,
    ) -> Result<(), DeployError> {
        if let Some(file) = seed.import.as_deref().filter(|s| !s.is_empty()) {
            return self.import(api, identity, file).await;
        }
        if let Some(command) = seed.run.as_deref().filter(|s| !s.is_empty()) {
            return self.run(command).await;
        }
        debug!("Nothing to seed for {}", identity);
        Ok(())
    }
}

/// Seeding only happens for projects this run created.
pub fn should_seed(
    has_migration: bool,
    seed: Option<&SeedConfig>,
    no_seed: bool,
    project_new: bool,
) -> bool {
    has_migration && seed.is_some() && !no_seed && project_new
}

/// Print the seed banner and action, then call the seeder.
pub async fn invoke_seeder(
    seeder: &dyn Seeder,
    api: &dyn ClusterApi,
    ctx: &DeployContext,
    seed: &SeedConfig,
    out: &mut dyn Output,
) -> Result<(), DeployError> {
    if ctx.show_hooks_banner() {
        out.log("");
        out.line(Tone::Bold, "Hooks:");
    }

    let started = Instant::now();
    let source = seed.source();
    match source {
        Some(source) => out.action_start(&format!("Seeding based on {}", source)),
        None => out.warn(
            "Invalid seed property in `shipyard.toml`. Please use `import` or `run` under the `seed` property.",
        ),
    }

    seeder.seed(api, ctx.identity(), seed).await?;

    if source.is_some() {
        out.action_stop(&pretty_time(started.elapsed()));
    }
    Ok(())
}
