//! The deploy command: one run from target resolution to endpoint report.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use super::endpoints::report_endpoints;
use super::generate::{ClientGenerator, GenerateRequest, GenerationTrigger};
use super::hooks::HookRunner;
use super::poller::{MigrationPoller, progress};
use super::report::report_payload;
use super::seed::{Seeder, invoke_seeder, should_seed};
use super::target::{Authenticator, EndpointDialog, ResolvedTarget, resolve_target};
use super::{DeployContext, DeployOptions, DeployOutcome};
use crate::client::{ClusterApi, ClusterConnector, DeploymentRequest};
use crate::cluster::{ClusterEnvironment, ProjectIdentity};
use crate::definition::{DEFINITION_FILE, DefinitionStore, HookKind, ServiceDefinition};
use crate::error::DeployError;
use crate::output::Output;
use crate::process::ProcessRunner;
use crate::util::pretty_time;

/// Deploys a service definition, borrowing every collaborator it talks to.
pub struct DeployCommand<'a> {
    connector: &'a dyn ClusterConnector,
    dialog: &'a dyn EndpointDialog,
    authenticator: &'a dyn Authenticator,
    runner: &'a dyn ProcessRunner,
    generator: &'a dyn ClientGenerator,
    seeder: &'a dyn Seeder,
}

impl<'a> DeployCommand<'a> {
    pub fn new(
        connector: &'a dyn ClusterConnector,
        dialog: &'a dyn EndpointDialog,
        authenticator: &'a dyn Authenticator,
        runner: &'a dyn ProcessRunner,
        generator: &'a dyn ClientGenerator,
        seeder: &'a dyn Seeder,
    ) -> Self {
        Self {
            connector,
            dialog,
            authenticator,
            runner,
            generator,
            seeder,
        }
    }

    /// Run the deployment.
    ///
    /// Validation errors and unforced warnings are printed to `out` before
    /// the error is returned (see [`DeployError::is_reported`]).
    pub async fn execute(
        &self,
        store: &mut DefinitionStore,
        env: &mut ClusterEnvironment,
        options: &DeployOptions,
        out: &mut dyn Output,
    ) -> Result<DeployOutcome, DeployError> {
        require_datamodel(store.definition())?;

        let target = resolve_target(
            store,
            env,
            self.connector,
            self.dialog,
            self.authenticator,
            options.interactive,
            out,
        )
        .await?;

        let api = self.connector.connect(&target.cluster)?;

        debug!("Checking if project {} exists", target.identity);
        let project_new = if project_exists(api.as_ref(), &target.identity).await {
            false
        } else {
            self.add_project(api.as_ref(), &target, store.definition(), out)
                .await?;
            true
        };

        let ctx = DeployContext {
            target,
            options: options.clone(),
            project_new,
        };
        self.deploy(api.as_ref(), store.definition(), &store.dir(), &ctx, out)
            .await
    }

    async fn add_project(
        &self,
        api: &dyn ClusterApi,
        target: &ResolvedTarget,
        definition: &ServiceDefinition,
        out: &mut dyn Output,
    ) -> Result<(), DeployError> {
        out.action_start(&format!(
            "Creating stage {} for service {}",
            target.stage, target.service
        ));
        let secrets = definition.secrets();
        api.add_project(&target.identity, secrets.as_deref()).await?;
        out.action_stop("done");
        info!("Created project {}", target.identity);
        Ok(())
    }

    async fn deploy(
        &self,
        api: &dyn ClusterApi,
        definition: &ServiceDefinition,
        base_dir: &Path,
        ctx: &DeployContext,
        out: &mut dyn Output,
    ) -> Result<DeployOutcome, DeployError> {
        let options = &ctx.options;
        let target = &ctx.target;
        let data_model = require_datamodel(definition)?;

        let request = DeploymentRequest {
            identity: target.identity.clone(),
            data_model: data_model.to_string(),
            subscriptions: definition.subscriptions().to_vec(),
            secrets: definition.secrets(),
            dry_run: options.dry_run,
            force: options.force,
            no_migrate: options.no_migrate,
        };

        let verb = if options.dry_run {
            "Performing dry run for"
        } else {
            "Deploying"
        };
        let started = Instant::now();
        out.action_start(&format!(
            "{} service `{}` to stage `{}` to server `{}`",
            verb, target.service, target.stage, target.cluster.name
        ));
        let payload = api.deploy(&request).await?;
        out.action_stop(&pretty_time(started.elapsed()));

        let changes = report_payload(&payload, options.force, options.dry_run, out)?;

        let poller = MigrationPoller::new(api, options.poll);
        let pending = payload.pending_migration(options.dry_run);

        if let Some(migration) = pending {
            let expected = migration.steps.len();
            let started = Instant::now();
            out.action_start("Applying changes");
            let result = poller
                .poll_until_terminal(&target.identity, expected, |applied, expected| {
                    out.action_status(&progress(applied, expected))
                })
                .await;
            out.action_stop(&pretty_time(started.elapsed()));
            result?;
        }

        let hooks = definition.hooks(HookKind::PostDeploy);
        let hook_reports = HookRunner::new(self.runner)
            .run_post_deploy(hooks, options.skip_hooks, out)
            .await;

        let workspace = target.workspace.as_deref();
        let http_endpoint = target
            .cluster
            .api_endpoint(&target.service, &target.stage, workspace);
        let ws_endpoint = target
            .cluster
            .ws_endpoint(&target.service, &target.stage, workspace);

        let mut generated = false;
        match pending {
            Some(migration) if !options.no_generate => {
                let expected = migration.steps.len();
                let snapshot = poller
                    .poll_until_terminal(&target.identity, expected, |_, _| {})
                    .await?;
                let generate = GenerateRequest {
                    base_dir,
                    generators: definition.generators(),
                    datamodel: data_model,
                    service: &target.service,
                    stage: &target.stage,
                    http_endpoint: &http_endpoint,
                    ws_endpoint: &ws_endpoint,
                };
                generated = GenerationTrigger::new(self.generator).run(
                    &snapshot,
                    expected,
                    hooks,
                    options.skip_hooks,
                    &generate,
                    out,
                )?;
            }
            _ => debug!("Skipping implicit client generation"),
        }

        let has_migration = payload.migration.is_some();
        let mut seeded = false;
        if let Some(seed) = definition.seed()
            && should_seed(has_migration, Some(seed), options.no_seed, ctx.project_new)
        {
            invoke_seeder(self.seeder, api, ctx, seed, out).await?;
            seeded = true;
        }

        let endpoints = if has_migration {
            Some(
                report_endpoints(
                    api,
                    &target.cluster,
                    &target.service,
                    &target.stage,
                    workspace,
                    out,
                )
                .await,
            )
        } else {
            None
        };

        Ok(DeployOutcome {
            service: target.service.clone(),
            stage: target.stage.clone(),
            cluster: target.cluster.name.clone(),
            workspace: target.workspace.clone(),
            dry_run: options.dry_run,
            project_new: ctx.project_new,
            changes,
            http_endpoint: endpoints.as_ref().map(|e| e.http.clone()),
            ws_endpoint: endpoints.map(|e| e.ws),
            finished_at: chrono::Utc::now(),
            hooks: hook_reports,
            generated,
            seeded,
        })
    }
}

/// Lookup failures of any kind count as "does not exist".
async fn project_exists(api: &dyn ClusterApi, identity: &ProjectIdentity) -> bool {
    match api.get_project(identity).await {
        Ok(_) => true,
        Err(e) => {
            debug!("Project {} not found: {}", identity, e);
            false
        }
    }
}

fn require_datamodel(definition: &ServiceDefinition) -> Result<&str, DeployError> {
    definition.datamodel().ok_or_else(|| {
        DeployError::Configuration(format!(
            "The property `datamodel` is missing in your {}",
            DEFINITION_FILE
        ))
    })
}
