//! Service endpoint parsing.
//!
//! An endpoint has the shape `http(s)://host[:port]/[workspace/]service/stage`.
//! Missing service and stage segments default to `default`.

use anyhow::Context;
use url::Url;

/// Domain suffix of the hosted cloud clusters
pub const CLOUD_DOMAIN: &str = "shipyard.cloud";

/// Public (shared) demo regions on the cloud domain
const SHARED_REGIONS: &[&str] = &["eu1", "us1"];

/// Hostnames treated as a cluster on the operator's machine
const LOCAL_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "host.docker.internal",
    "[::1]",
];

/// Default service and stage segment value
pub const DEFAULT_SEGMENT: &str = "default";

/// Parsed components of a service endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEndpoint {
    pub service: String,
    pub stage: String,
    pub workspace: Option<String>,
    /// Scheme, host and port without a trailing slash
    pub cluster_base_url: String,
    pub cluster_name: String,
    pub local: bool,
    pub shared: bool,
    pub private: bool,
}

/// Parse an endpoint URL into service, stage, workspace and cluster facts.
pub fn parse_endpoint(endpoint: &str) -> anyhow::Result<ParsedEndpoint> {
    let url = Url::parse(endpoint.trim())
        .with_context(|| format!("Invalid endpoint: {}", endpoint))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("Endpoint has no host: {}", endpoint))?
        .to_string();

    let mut cluster_base_url = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        cluster_base_url.push_str(&format!(":{}", port));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let (workspace, service, stage) = match segments.as_slice() {
        [] => (None, DEFAULT_SEGMENT, DEFAULT_SEGMENT),
        [service] => (None, *service, DEFAULT_SEGMENT),
        [service, stage] => (None, *service, *stage),
        [workspace, service, stage] => (Some(workspace.to_string()), *service, *stage),
        _ => anyhow::bail!(
            "Endpoint {} has too many path segments. Expected [workspace/]service/stage",
            endpoint
        ),
    };

    let local = LOCAL_HOSTS.contains(&host.as_str());
    let region = host.strip_suffix(&format!(".{}", CLOUD_DOMAIN));
    let shared = region.is_some_and(|r| SHARED_REGIONS.contains(&r));
    let private = region.is_some() && !shared;

    let cluster_name = if local {
        "local".to_string()
    } else if let Some(region) = region {
        if shared {
            format!("shipyard-{}", region)
        } else {
            region.replace('.', "_")
        }
    } else {
        "default".to_string()
    };

    Ok(ParsedEndpoint {
        service: service.to_string(),
        stage: stage.to_string(),
        workspace,
        cluster_base_url,
        cluster_name,
        local,
        shared,
        private,
    })
}
