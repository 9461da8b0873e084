//! Schema of the service definition file (`shipyard.toml`)
//!
//! ```toml
//! endpoint = "http://localhost:4466/blog/dev"
//! datamodel = ["types.graphql", "enums.graphql"]
//! secret = "${env:BLOG_SECRET}"
//!
//! [subscriptions.welcome-email]
//! query = "subscriptions/welcome.graphql"
//! webhook = { url = "https://hooks.example.com/welcome", headers = { Authorization = "Bearer x" } }
//!
//! [seed]
//! import = "seed.json"
//!
//! [hooks]
//! post-deploy = ["graphql get-schema", "echo deployed"]
//!
//! [[generate]]
//! generator = "typescript-client"
//! output = "./generated/client"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root structure of `shipyard.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionFile {
    /// Service endpoint: `http(s)://host[:port]/[workspace/]service/stage`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Data model file(s), relative to the definition file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datamodel: Option<DatamodelFiles>,

    /// Comma-separated service secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subscriptions: BTreeMap<String, SubscriptionEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedConfig>,

    #[serde(default)]
    pub hooks: HooksConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generate: Vec<GenerateEntry>,
}

/// One data model file or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatamodelFiles {
    One(String),
    Many(Vec<String>),
}

impl DatamodelFiles {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            DatamodelFiles::One(path) => vec![path.as_str()],
            DatamodelFiles::Many(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

/// Server-side subscription calling a webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionEntry {
    /// Path to the subscription query file
    pub query: String,
    pub webhook: Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Webhook {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

impl Webhook {
    pub fn url(&self) -> &str {
        match self {
            Webhook::Url(url) => url,
            Webhook::Detailed { url, .. } => url,
        }
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            Webhook::Url(_) => Vec::new(),
            Webhook::Detailed { headers, .. } => headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Initial data for newly created services
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Data file to import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,

    /// Command to run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
}

impl SeedConfig {
    /// The configured seed source (`import` wins over `run`).
    pub fn source(&self) -> Option<&str> {
        self.import
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.run.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Lifecycle hooks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(rename = "post-deploy", default, skip_serializing_if = "Vec::is_empty")]
    pub post_deploy: Vec<String>,
}

/// Client generation target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateEntry {
    pub generator: String,
    pub output: String,
}

impl DefinitionFile {
    /// Validate fields serde cannot check.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, subscription) in &self.subscriptions {
            if subscription.webhook.url().trim().is_empty() {
                anyhow::bail!("Subscription '{}' has an empty webhook url", name);
            }
            if subscription.query.trim().is_empty() {
                anyhow::bail!("Subscription '{}' has no query file", name);
            }
        }
        for entry in &self.generate {
            if entry.generator.trim().is_empty() || entry.output.trim().is_empty() {
                anyhow::bail!("Every [[generate]] entry needs a generator and an output");
            }
        }
        Ok(())
    }
}
