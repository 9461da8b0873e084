//! Clusters, service endpoints and project identities.

pub mod endpoint;
pub mod environment;

use serde::{Deserialize, Serialize};

pub use endpoint::{ParsedEndpoint, parse_endpoint};
pub use environment::{ClusterEntry, ClusterEnvironment, GlobalConfig};

/// Default address of a cluster running on the operator's machine
pub const LOCAL_CLUSTER_URL: &str = "http://localhost:4466";

/// A remote execution target hosting services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    /// Scheme, host and port, without trailing slash
    pub base_url: String,
    /// Runs on the operator's machine (reachability is checked before deploying)
    pub local: bool,
    /// Multi-tenant cloud cluster; project names are scoped by workspace
    pub shared: bool,
    /// Requires an authenticated session
    pub is_private: bool,
    /// Session key or management secret used for authentication
    #[serde(skip)]
    pub secret: Option<String>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            local: false,
            shared: false,
            is_private: false,
            secret: None,
        }
    }

    /// The always-available `local` cluster.
    pub fn local_default() -> Self {
        Self {
            local: true,
            ..Self::new("local", LOCAL_CLUSTER_URL)
        }
    }

    /// Build a cluster from a parsed service endpoint.
    pub fn from_endpoint(parsed: &ParsedEndpoint) -> Self {
        Self {
            local: parsed.local,
            shared: parsed.shared,
            is_private: parsed.private,
            ..Self::new(parsed.cluster_name.clone(), parsed.cluster_base_url.clone())
        }
    }

    /// URL of the management API.
    pub fn management_url(&self) -> String {
        format!("{}/management", self.base_url)
    }

    /// HTTP endpoint of a deployed service.
    pub fn api_endpoint(&self, service: &str, stage: &str, workspace: Option<&str>) -> String {
        if !self.shared && service == endpoint::DEFAULT_SEGMENT && stage == endpoint::DEFAULT_SEGMENT
        {
            return self.base_url.clone();
        }
        if !self.shared && stage == endpoint::DEFAULT_SEGMENT {
            return format!("{}/{}", self.base_url, service);
        }
        if self.local || !(self.shared || self.is_private) {
            return format!("{}/{}/{}", self.base_url, service, stage);
        }
        match workspace {
            Some(ws) => format!("{}/{}/{}/{}", self.base_url, ws, service, stage),
            None => format!("{}/{}/{}", self.base_url, service, stage),
        }
    }

    /// WebSocket endpoint of a deployed service.
    pub fn ws_endpoint(&self, service: &str, stage: &str, workspace: Option<&str>) -> String {
        let http = self.api_endpoint(service, stage, workspace);
        if let Some(rest) = http.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = http.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            http
        }
    }

    /// Admin console URL for a service endpoint.
    pub fn admin_link(http_endpoint: &str) -> String {
        format!("{}/_admin", http_endpoint)
    }
}

/// Key of a project on a cluster, computed once per run.
///
/// The cluster treats `name` as an opaque string, so every call of a run
/// must use the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectIdentity {
    pub name: String,
    pub stage: String,
}

impl ProjectIdentity {
    /// Compose the project name for `service` on `cluster`.
    ///
    /// Shared clusters scope names by workspace (`workspace~service`).
    pub fn new(cluster: &Cluster, service: &str, stage: &str, workspace: Option<&str>) -> Self {
        let name = match (cluster.shared, workspace) {
            (true, Some(ws)) => format!("{}~{}", ws, service),
            _ => service.to_string(),
        };
        Self {
            name,
            stage: stage.to_string(),
        }
    }
}

impl std::fmt::Display for ProjectIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.stage)
    }
}
