//! Service endpoint reporting.

use serde::Serialize;
use tracing::debug;

use crate::client::ClusterApi;
use crate::cluster::Cluster;
use crate::output::{Output, Tone};
use crate::util::satisfies_version;

/// First server version serving the admin console
pub const ADMIN_MIN_VERSION: &str = "1.29.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoints {
    pub http: String,
    pub ws: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<String>,
}

/// Compose the endpoints of a service.
pub fn service_endpoints(
    cluster: &Cluster,
    service: &str,
    stage: &str,
    workspace: Option<&str>,
    server_version: Option<&str>,
) -> ServiceEndpoints {
    let http = cluster.api_endpoint(service, stage, workspace);
    let admin = server_version
        .filter(|version| satisfies_version(version, ADMIN_MIN_VERSION))
        .map(|_| Cluster::admin_link(&http));
    ServiceEndpoints {
        ws: cluster.ws_endpoint(service, stage, workspace),
        http,
        admin,
    }
}

/// Print where the deployed service is reachable.
///
/// An unreachable version endpoint only hides the admin link.
pub async fn report_endpoints(
    api: &dyn ClusterApi,
    cluster: &Cluster,
    service: &str,
    stage: &str,
    workspace: Option<&str>,
    out: &mut dyn Output,
) -> ServiceEndpoints {
    let version = match api.server_version().await {
        Ok(version) => version,
        Err(e) => {
            debug!("Could not fetch server version: {}", e);
            None
        }
    };
    let endpoints = service_endpoints(cluster, service, stage, workspace, version.as_deref());
    print_endpoints(&endpoints, "Your service endpoint is live:", out);
    endpoints
}

pub fn print_endpoints(endpoints: &ServiceEndpoints, heading: &str, out: &mut dyn Output) {
    out.log("");
    out.line(Tone::Bold, heading);
    out.log("");
    out.log(&format!("  HTTP:  {}", endpoints.http));
    out.log(&format!("  WS:    {}", endpoints.ws));
    if let Some(admin) = &endpoints.admin {
        out.log(&format!("  Admin: {}", admin));
    }
    out.log("");
}
