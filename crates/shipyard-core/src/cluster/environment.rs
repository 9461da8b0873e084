//! Global environment: known clusters and the cloud session.
//!
//! Stored in `~/.config/shipyard/config.toml`:
//!
//! ```toml
//! cloud_session_key = "..."
//!
//! [clusters.staging]
//! host = "https://staging.example.com"
//! secret = "..."
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Cluster;

/// Environment variable holding a management API secret for self-hosted clusters
pub const MANAGEMENT_SECRET_ENV: &str = "SHIPYARD_MANAGEMENT_API_SECRET";

/// Root of the global config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_session_key: Option<String>,

    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterEntry>,
}

/// A named cluster in the global config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub host: String,

    #[serde(default)]
    pub local: bool,

    #[serde(default)]
    pub shared: bool,

    #[serde(default)]
    pub private: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Known clusters plus session state.
#[derive(Debug, Clone)]
pub struct ClusterEnvironment {
    config_path: PathBuf,
    config: GlobalConfig,
    management_secret: Option<String>,
}

impl ClusterEnvironment {
    /// Load from `~/.config/shipyard/config.toml` and the process environment.
    pub fn from_default_location() -> anyhow::Result<Self> {
        let config_dir = dirs::config_dir()
            .map(|p| p.join("shipyard"))
            .or_else(|| dirs::home_dir().map(|h| h.join(".config").join("shipyard")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        let env = Self::from_path(config_dir.join("config.toml"))?;
        Ok(env.with_management_secret(std::env::var(MANAGEMENT_SECRET_ENV).ok()))
    }

    /// Load from an explicit config path. A missing file yields an empty config.
    pub fn from_path(config_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let config_path = config_path.into();
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            GlobalConfig::default()
        };
        Ok(Self {
            config_path,
            config,
            management_secret: None,
        })
    }

    pub fn with_management_secret(mut self, secret: Option<String>) -> Self {
        self.management_secret = secret.filter(|s| !s.is_empty());
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Non-empty cloud session key, if logged in.
    pub fn session_key(&self) -> Option<&str> {
        self.config
            .cloud_session_key
            .as_deref()
            .filter(|key| !key.is_empty())
    }

    pub fn set_session_key(&mut self, key: impl Into<String>) {
        self.config.cloud_session_key = Some(key.into());
    }

    pub fn management_secret(&self) -> Option<&str> {
        self.management_secret.as_deref()
    }

    /// All known clusters: the built-in `local` cluster first, then configured ones.
    pub fn clusters(&self) -> Vec<Cluster> {
        let mut clusters = Vec::with_capacity(self.config.clusters.len() + 1);
        if !self.config.clusters.contains_key("local") {
            clusters.push(Cluster::local_default());
        }
        clusters.extend(
            self.config
                .clusters
                .iter()
                .map(|(name, entry)| self.cluster_from_entry(name, entry)),
        );
        clusters
    }

    /// Look up a cluster by name.
    pub fn cluster(&self, name: &str) -> Option<Cluster> {
        if let Some(entry) = self.config.clusters.get(name) {
            return Some(self.cluster_from_entry(name, entry));
        }
        (name == "local").then(Cluster::local_default)
    }

    /// Attach the credential a cluster should be called with.
    ///
    /// Cloud clusters use the session key, self-hosted ones their configured
    /// secret or the management secret from the environment.
    pub fn authorize(&self, cluster: &mut Cluster) {
        if cluster.secret.is_some() {
            return;
        }
        cluster.secret = if cluster.shared || cluster.is_private {
            self.session_key().map(str::to_string)
        } else {
            self.management_secret.clone()
        };
    }

    fn cluster_from_entry(&self, name: &str, entry: &ClusterEntry) -> Cluster {
        let mut cluster = Cluster {
            local: entry.local,
            shared: entry.shared,
            is_private: entry.private,
            secret: entry.secret.clone(),
            ..Cluster::new(name, entry.host.clone())
        };
        self.authorize(&mut cluster);
        cluster
    }

    /// Persist the config (session key, clusters).
    pub fn save(&self) -> anyhow::Result<()> {
        let content =
            toml::to_string_pretty(&self.config).context("Failed to serialize global config")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!("Failed to write config file: {}", self.config_path.display())
        })?;
        debug!("Saved global config to {}", self.config_path.display());
        Ok(())
    }
}
