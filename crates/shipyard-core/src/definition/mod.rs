//! Service definition loading.
//!
//! The definition file (`shipyard.toml`) describes what gets deployed: the
//! endpoint (cluster, workspace, service and stage), the data model,
//! secrets, subscriptions, seed, hooks and generators.

pub mod env_file;
pub mod parser;
pub mod schema;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::{ParsedEndpoint, parse_endpoint};

pub use env_file::{load_env_file, parse_env_file};
pub use parser::{parse_definition, parse_definition_str};
pub use schema::{DefinitionFile, GenerateEntry, HooksConfig, SeedConfig};

/// Default definition file name
pub const DEFINITION_FILE: &str = "shipyard.toml";

/// Lifecycle points hooks can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    PostDeploy,
}

/// Webhook header sent with a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInput {
    pub name: String,
    pub value: String,
}

/// A subscription with its query file resolved, as sent to the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInput {
    pub name: String,
    pub query: String,
    pub url: String,
    pub headers: Vec<HeaderInput>,
}

/// A loaded definition with files resolved.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    file: DefinitionFile,
    endpoint: Option<ParsedEndpoint>,
    datamodel: Option<String>,
    subscriptions: Vec<SubscriptionInput>,
}

impl ServiceDefinition {
    /// Resolve a parsed definition relative to `base_dir`.
    pub fn resolve(file: DefinitionFile, base_dir: &Path) -> anyhow::Result<Self> {
        let endpoint = file.endpoint.as_deref().map(parse_endpoint).transpose()?;

        let datamodel = match &file.datamodel {
            Some(files) => {
                let mut types = Vec::new();
                for relative in files.paths() {
                    let path = base_dir.join(relative);
                    let content = std::fs::read_to_string(&path).with_context(|| {
                        format!("Failed to read datamodel file: {}", path.display())
                    })?;
                    types.push(content);
                }
                Some(types.join("\n"))
            }
            None => None,
        };

        let mut subscriptions = Vec::with_capacity(file.subscriptions.len());
        for (name, entry) in &file.subscriptions {
            let path = base_dir.join(&entry.query);
            let query = std::fs::read_to_string(&path).with_context(|| {
                format!(
                    "Failed to read query of subscription '{}': {}",
                    name,
                    path.display()
                )
            })?;
            subscriptions.push(SubscriptionInput {
                name: name.clone(),
                query,
                url: entry.webhook.url().to_string(),
                headers: entry
                    .webhook
                    .headers()
                    .into_iter()
                    .map(|(name, value)| HeaderInput { name, value })
                    .collect(),
            });
        }

        Ok(Self {
            file,
            endpoint,
            datamodel,
            subscriptions,
        })
    }

    pub fn file(&self) -> &DefinitionFile {
        &self.file
    }

    pub fn endpoint(&self) -> Option<&ParsedEndpoint> {
        self.endpoint.as_ref()
    }

    pub fn service(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.service.as_str())
    }

    pub fn stage(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.stage.as_str())
    }

    pub fn workspace(&self) -> Option<&str> {
        self.endpoint.as_ref().and_then(|e| e.workspace.as_deref())
    }

    /// Concatenated data model text, `None` when the property is missing.
    pub fn datamodel(&self) -> Option<&str> {
        self.datamodel.as_deref()
    }

    /// Secrets from the comma-separated `secret` property.
    pub fn secrets(&self) -> Option<Vec<String>> {
        self.file.secret.as_ref().map(|secret| {
            secret
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn subscriptions(&self) -> &[SubscriptionInput] {
        &self.subscriptions
    }

    pub fn hooks(&self, kind: HookKind) -> &[String] {
        match kind {
            HookKind::PostDeploy => &self.file.hooks.post_deploy,
        }
    }

    pub fn seed(&self) -> Option<&SeedConfig> {
        self.file.seed.as_ref()
    }

    pub fn generators(&self) -> &[GenerateEntry] {
        &self.file.generate
    }
}

/// A definition file on disk plus its resolved contents.
#[derive(Debug, Clone)]
pub struct DefinitionStore {
    path: PathBuf,
    definition: ServiceDefinition,
}

impl DefinitionStore {
    /// Load the definition, injecting `env_file` first when given.
    pub fn load(path: impl Into<PathBuf>, env_file: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(env_file) = env_file {
            load_env_file(env_file)?;
        }
        let definition = Self::read(&path)?;
        Ok(Self { path, definition })
    }

    fn read(path: &Path) -> anyhow::Result<ServiceDefinition> {
        let file = parse_definition(path)?;
        ServiceDefinition::resolve(file, &base_dir(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the definition; hooks and seeds run from here.
    pub fn dir(&self) -> PathBuf {
        base_dir(&self.path)
    }

    pub fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    /// Re-read the file from disk.
    pub fn reload(&mut self) -> anyhow::Result<()> {
        self.definition = Self::read(&self.path)?;
        Ok(())
    }

    /// Write a new `endpoint` into the file and reload it.
    ///
    /// Only the top-level `endpoint` line changes; comments and the other
    /// keys stay as the operator wrote them.
    pub fn replace_endpoint(&mut self, endpoint: &str) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read definition file: {}", self.path.display()))?;
        let updated = set_top_level_key(&content, "endpoint", &toml::Value::from(endpoint));
        std::fs::write(&self.path, updated)
            .with_context(|| format!("Failed to write definition file: {}", self.path.display()))?;
        debug!("Wrote endpoint {} to {}", endpoint, self.path.display());
        self.reload()
    }
}

/// Set `key = value` among the top-level keys of a TOML document.
///
/// An existing assignment before the first table header is replaced in
/// place. Otherwise the line is inserted after the leading comment block.
fn set_top_level_key(content: &str, key: &str, value: &toml::Value) -> String {
    let assignment = format!("{} = {}", key, value);
    let inserted = format!("{}\n", assignment);
    let mut lines: Vec<&str> = content.split_inclusive('\n').collect();

    let mut header_end = 0;
    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            break;
        }
        if assigns_key(trimmed, key) {
            let ending = if line.ends_with("\r\n") {
                "\r\n"
            } else if line.ends_with('\n') {
                "\n"
            } else {
                ""
            };
            let replaced = format!("{}{}", assignment, ending);
            let mut updated = String::with_capacity(content.len() + replaced.len());
            for (i, line) in lines.iter().enumerate() {
                updated.push_str(if i == index { replaced.as_str() } else { *line });
            }
            return updated;
        }
        if header_end == index && trimmed.starts_with('#') {
            header_end = index + 1;
        }
    }

    if header_end > 0 && !lines[header_end - 1].ends_with('\n') {
        lines.insert(header_end, "\n");
        header_end += 1;
    }
    lines.insert(header_end, &inserted);
    lines.concat()
}

fn assigns_key(line: &str, key: &str) -> bool {
    line.strip_prefix(key)
        .map(str::trim_start)
        .is_some_and(|rest| rest.starts_with('='))
}

fn base_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_project(temp: &TempDir, definition: &str) -> PathBuf {
        std::fs::write(
            temp.path().join("datamodel.graphql"),
            "type User { id: ID! @id }",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("welcome.graphql"),
            "subscription { user { node { id } } }",
        )
        .unwrap();
        let path = temp.path().join(DEFINITION_FILE);
        std::fs::write(&path, definition).unwrap();
        path
    }

    #[test]
    fn test_load_resolves_files() {
        let temp = TempDir::new().unwrap();
        let path = write_project(
            &temp,
            r#"
endpoint = "http://localhost:4466/blog/dev"
datamodel = "datamodel.graphql"
secret = "one, two"

[subscriptions.welcome]
query = "welcome.graphql"
webhook = "https://hooks.example.com/welcome"
"#,
        );

        let store = DefinitionStore::load(&path, None).unwrap();
        let def = store.definition();
        assert_eq!(def.service(), Some("blog"));
        assert_eq!(def.stage(), Some("dev"));
        assert_eq!(def.datamodel(), Some("type User { id: ID! @id }"));
        assert_eq!(def.secrets(), Some(vec!["one".to_string(), "two".to_string()]));
        assert_eq!(def.subscriptions().len(), 1);
        assert_eq!(def.subscriptions()[0].url, "https://hooks.example.com/welcome");
        assert!(def.subscriptions()[0].query.starts_with("subscription"));
    }

    #[test]
    fn test_missing_datamodel_file_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFINITION_FILE);
        std::fs::write(&path, "datamodel = \"missing.graphql\"").unwrap();

        let err = DefinitionStore::load(&path, None).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.graphql"));
    }

    #[test]
    fn test_replace_endpoint_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        let path = write_project(
            &temp,
            "datamodel = \"datamodel.graphql\"\n\n[hooks]\npost-deploy = [\"echo hi\"]\n",
        );

        let mut store = DefinitionStore::load(&path, None).unwrap();
        assert!(store.definition().service().is_none());

        store
            .replace_endpoint("http://localhost:4466/shop/prod")
            .unwrap();
        assert_eq!(store.definition().service(), Some("shop"));
        assert_eq!(store.definition().stage(), Some("prod"));
        assert_eq!(
            store.definition().hooks(HookKind::PostDeploy),
            &["echo hi".to_string()]
        );

        let reloaded = DefinitionStore::load(&path, None).unwrap();
        assert_eq!(reloaded.definition().service(), Some("shop"));
    }

    #[test]
    fn test_replace_endpoint_keeps_comments_and_order() {
        let temp = TempDir::new().unwrap();
        let original = "# Blog service\n\
endpoint = \"http://localhost:4466/old/dev\"\n\
datamodel = \"datamodel.graphql\"\n\
\n\
[hooks]\n\
# regenerate docs\n\
post-deploy = [\"echo hi\"]\n";
        let path = write_project(&temp, original);

        let mut store = DefinitionStore::load(&path, None).unwrap();
        store
            .replace_endpoint("http://localhost:4466/blog/dev")
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            original.replace(
                "endpoint = \"http://localhost:4466/old/dev\"",
                "endpoint = \"http://localhost:4466/blog/dev\""
            )
        );
        assert_eq!(store.definition().service(), Some("blog"));
    }

    #[test]
    fn test_replace_endpoint_inserts_after_leading_comments() {
        let temp = TempDir::new().unwrap();
        let path = write_project(
            &temp,
            "# Blog service\n# owned by the web team\n\ndatamodel = \"datamodel.graphql\"\n",
        );

        let mut store = DefinitionStore::load(&path, None).unwrap();
        store
            .replace_endpoint("http://localhost:4466/blog/dev")
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "# Blog service\n# owned by the web team\nendpoint = \"http://localhost:4466/blog/dev\"\n\ndatamodel = \"datamodel.graphql\"\n"
        );
    }

    #[test]
    fn test_set_top_level_key_ignores_table_keys() {
        let value = toml::Value::from("http://localhost:4466/a/b");
        let content = "[other]\nendpoint = \"nested\"\n";
        assert_eq!(
            set_top_level_key(content, "endpoint", &value),
            "endpoint = \"http://localhost:4466/a/b\"\n[other]\nendpoint = \"nested\"\n"
        );
        assert_eq!(
            set_top_level_key("", "endpoint", &value),
            "endpoint = \"http://localhost:4466/a/b\"\n"
        );
        assert_eq!(
            set_top_level_key("# only a comment", "endpoint", &value),
            "# only a comment\nendpoint = \"http://localhost:4466/a/b\"\n"
        );
    }
}
