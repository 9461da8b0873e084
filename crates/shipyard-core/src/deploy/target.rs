//! Target resolution: which cluster, service and stage a run deploys to.

use tracing::debug;

use crate::client::ClusterConnector;
use crate::cluster::{Cluster, ClusterEnvironment, ProjectIdentity};
use crate::definition::{DEFINITION_FILE, DefinitionStore, ServiceDefinition};
use crate::error::DeployError;
use crate::output::Output;

/// A target picked interactively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub cluster: Cluster,
    pub workspace: Option<String>,
    pub service: String,
    pub stage: String,
    /// Endpoint URL to persist into the definition
    pub endpoint: String,
}

/// Asks a human for the deploy target.
pub trait EndpointDialog: Send + Sync {
    fn select(
        &self,
        env: &ClusterEnvironment,
        definition: &ServiceDefinition,
    ) -> Result<ResolvedEndpoint, DeployError>;
}

/// Obtains a cloud session key.
pub trait Authenticator: Send + Sync {
    fn login(&self, env: &ClusterEnvironment) -> Result<String, DeployError>;
}

/// Where a run deploys to, with credentials attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub cluster: Cluster,
    pub service: String,
    pub stage: String,
    pub workspace: Option<String>,
    pub identity: ProjectIdentity,
}

/// Resolve the target of a run.
///
/// Asks through `dialog` when the definition lacks a service or stage, or
/// when `interactive` is set, and persists the chosen endpoint. Local
/// clusters must answer; private cloud clusters without credentials trigger
/// a login.
pub async fn resolve_target(
    store: &mut DefinitionStore,
    env: &mut ClusterEnvironment,
    connector: &dyn ClusterConnector,
    dialog: &dyn EndpointDialog,
    authenticator: &dyn Authenticator,
    interactive: bool,
    out: &mut dyn Output,
) -> Result<ResolvedTarget, DeployError> {
    let known = match (store.definition().service(), store.definition().stage()) {
        (Some(service), Some(stage)) if !interactive => {
            Some((service.to_string(), stage.to_string()))
        }
        _ => None,
    };

    let (mut cluster, service, stage, workspace) = match known {
        Some((service, stage)) => {
            let definition = store.definition();
            (
                definition_cluster(definition, env)?,
                service,
                stage,
                definition.workspace().map(str::to_string),
            )
        }
        None => {
            let resolved = dialog.select(env, store.definition())?;
            store.replace_endpoint(&resolved.endpoint)?;
            out.log("");
            out.log(&format!(
                "Written endpoint `{}` to {}",
                resolved.endpoint, DEFINITION_FILE
            ));
            out.log("");
            (
                resolved.cluster,
                resolved.service,
                resolved.stage,
                resolved.workspace,
            )
        }
    };

    // The reachability check uses the credential every later call uses.
    env.authorize(&mut cluster);
    if cluster.local && !connector.is_online(&cluster).await {
        return Err(DeployError::UnreachableCluster {
            base_url: cluster.base_url.clone(),
        });
    }

    if needs_login(&cluster, workspace.as_deref(), env) {
        debug!("Logging in for private cluster {}", cluster.name);
        let key = authenticator.login(env)?;
        env.set_session_key(key.clone());
        env.save()?;
        cluster.secret = Some(key);
    }

    let identity = ProjectIdentity::new(&cluster, &service, &stage, workspace.as_deref());
    Ok(ResolvedTarget {
        cluster,
        service,
        stage,
        workspace,
        identity,
    })
}

/// The cluster named by the definition's endpoint: a configured cluster of
/// that name at the same address, else one built from the URL itself.
pub fn definition_cluster(
    definition: &ServiceDefinition,
    env: &ClusterEnvironment,
) -> Result<Cluster, DeployError> {
    let endpoint = definition.endpoint().ok_or_else(|| {
        DeployError::Configuration(format!(
            "No cluster set. Please set the `endpoint` property in your {}",
            DEFINITION_FILE
        ))
    })?;
    let cluster = env
        .cluster(&endpoint.cluster_name)
        .filter(|cluster| cluster.base_url == endpoint.cluster_base_url)
        .unwrap_or_else(|| Cluster::from_endpoint(endpoint));
    debug!("Resolved cluster {} at {}", cluster.name, cluster.base_url);
    Ok(cluster)
}

fn needs_login(cluster: &Cluster, workspace: Option<&str>, env: &ClusterEnvironment) -> bool {
    !cluster.local
        && cluster.is_private
        && cluster.secret.is_none()
        && workspace.is_some_and(|ws| !ws.starts_with("public-"))
        && env.management_secret().is_none()
        && env.session_key().is_none()
}
