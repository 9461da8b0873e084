//! Service information for the `info` command.

use serde::Serialize;
use tracing::debug;

use crate::client::ClusterConnector;
use crate::cluster::ClusterEnvironment;
use crate::definition::{DEFINITION_FILE, DefinitionStore};
use crate::deploy::endpoints::service_endpoints;
use crate::deploy::target::definition_cluster;
use crate::error::DeployError;

/// Where a service stage is reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub name: String,
    pub stage: String,
    pub cluster: String,
    pub workspace: Option<String>,
    pub http_endpoint: String,
    pub ws_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Describe the service of a definition.
///
/// The cluster is only asked for its version (to decide on the admin link);
/// an unreachable cluster still yields the endpoints.
pub async fn service_info(
    store: &DefinitionStore,
    env: &ClusterEnvironment,
    connector: &dyn ClusterConnector,
    include_secret: bool,
) -> Result<ServiceInfo, DeployError> {
    let definition = store.definition();
    let (Some(service), Some(stage)) = (definition.service(), definition.stage()) else {
        return Err(DeployError::Configuration(format!(
            "No endpoint set. Please set the `endpoint` property in your {}",
            DEFINITION_FILE
        )));
    };

    let mut cluster = definition_cluster(definition, env)?;
    env.authorize(&mut cluster);

    let version = match connector.connect(&cluster) {
        Ok(api) => api.server_version().await.unwrap_or_else(|e| {
            debug!("Could not fetch server version: {}", e);
            None
        }),
        Err(e) => {
            debug!("Could not connect to {}: {}", cluster.base_url, e);
            None
        }
    };

    let workspace = definition.workspace();
    let endpoints = service_endpoints(&cluster, service, stage, workspace, version.as_deref());

    Ok(ServiceInfo {
        name: service.to_string(),
        stage: stage.to_string(),
        cluster: cluster.name.clone(),
        workspace: workspace.map(str::to_string),
        http_endpoint: endpoints.http,
        ws_endpoint: endpoints.ws,
        admin_endpoint: endpoints.admin,
        secret: if include_secret {
            definition.file().secret.clone()
        } else {
            None
        },
    })
}
