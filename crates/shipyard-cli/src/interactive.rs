//! Interactive prompts for the deploy command.
//!
//! Picks the deploy target when the definition has no endpoint (or `--new`
//! is passed) and asks for a cloud session key when a private cluster needs
//! one. Uses dialoguer for terminal UI prompts.

use console::style;
use dialoguer::{Input, Password, Select, theme::ColorfulTheme};

use shipyard_core::cluster::endpoint::CLOUD_DOMAIN;
use shipyard_core::cluster::{Cluster, ClusterEnvironment, parse_endpoint};
use shipyard_core::definition::ServiceDefinition;
use shipyard_core::deploy::{Authenticator, EndpointDialog, ResolvedEndpoint};
use shipyard_core::error::DeployError;

const OTHER_SERVER: &str = "Use other server";
const DEFAULT_STAGE: &str = "dev";

/// Endpoint selection through terminal prompts.
#[derive(Default)]
pub struct DialoguerEndpointDialog {
    theme: ColorfulTheme,
}

impl DialoguerEndpointDialog {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    fn prompt_cluster(&self, clusters: &[Cluster]) -> Result<Cluster, DeployError> {
        let items = cluster_items(clusters);
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Set up a new service or choose a server to deploy to")
            .items(&items)
            .default(0)
            .interact()
            .map_err(prompt_error)?;

        if let Some(cluster) = clusters.get(selection) {
            return Ok(cluster.clone());
        }

        let url: String = Input::with_theme(&self.theme)
            .with_prompt("Enter the endpoint of your server")
            .validate_with(|input: &String| -> Result<(), String> {
                parse_endpoint(input)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .interact_text()
            .map_err(prompt_error)?;
        let parsed = parse_endpoint(&url)?;
        Ok(Cluster::from_endpoint(&parsed))
    }

    fn prompt_text(&self, prompt: &str, default: &str) -> Result<String, DeployError> {
        let value: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default.to_string())
            .interact_text()
            .map_err(prompt_error)?;
        Ok(value.trim().to_string())
    }
}

impl EndpointDialog for DialoguerEndpointDialog {
    fn select(
        &self,
        env: &ClusterEnvironment,
        definition: &ServiceDefinition,
    ) -> Result<ResolvedEndpoint, DeployError> {
        let cluster = self.prompt_cluster(&env.clusters())?;

        let workspace = if cluster.shared || cluster.is_private {
            let default = definition.workspace().unwrap_or_default();
            Some(self.prompt_text("Choose the workspace", default)?).filter(|ws| !ws.is_empty())
        } else {
            None
        };

        let service = self.prompt_text(
            "Choose a name for your service",
            definition.service().unwrap_or("default"),
        )?;
        let stage = self.prompt_text(
            "Choose a name for your stage",
            definition.stage().unwrap_or(DEFAULT_STAGE),
        )?;

        Ok(resolved_endpoint(cluster, workspace, service, stage))
    }
}

/// Asks for a session key of the hosted cloud.
#[derive(Default)]
pub struct PromptAuthenticator {
    theme: ColorfulTheme,
}

impl PromptAuthenticator {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Authenticator for PromptAuthenticator {
    fn login(&self, env: &ClusterEnvironment) -> Result<String, DeployError> {
        eprintln!();
        eprintln!(
            "{}",
            style(format!("Authenticating with {}", CLOUD_DOMAIN)).bold()
        );
        eprintln!(
            "  The session key will be stored in {}",
            env.config_path().display()
        );

        let key = Password::with_theme(&self.theme)
            .with_prompt("Cloud session key")
            .interact()
            .map_err(prompt_error)?;
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(DeployError::Login("No session key provided".to_string()));
        }
        Ok(key)
    }
}

fn cluster_items(clusters: &[Cluster]) -> Vec<String> {
    let width = clusters.iter().map(|c| c.name.len()).max().unwrap_or(0);
    clusters
        .iter()
        .map(|cluster| {
            let kind = if cluster.local {
                "local"
            } else if cluster.shared {
                "shared"
            } else if cluster.is_private {
                "private"
            } else {
                "self-hosted"
            };
            format!(
                "{:width$}  {} ({})",
                cluster.name,
                cluster.base_url,
                kind,
                width = width
            )
        })
        .chain(std::iter::once(OTHER_SERVER.to_string()))
        .collect()
}

fn resolved_endpoint(
    cluster: Cluster,
    workspace: Option<String>,
    service: String,
    stage: String,
) -> ResolvedEndpoint {
    let endpoint = cluster.api_endpoint(&service, &stage, workspace.as_deref());
    ResolvedEndpoint {
        cluster,
        workspace,
        service,
        stage,
        endpoint,
    }
}

fn prompt_error(error: dialoguer::Error) -> DeployError {
    DeployError::Configuration(format!("Prompt failed: {}", error))
}
