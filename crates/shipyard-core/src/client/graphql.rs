//! GraphQL implementation of the management API over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header};
use reqwest::{Client, header};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use super::types::{DeployPayload, DeploymentRequest, MigrationStatusSnapshot, Project};
use super::{ClusterApi, ClusterConnector};
use crate::cluster::{Cluster, ProjectIdentity};
use crate::error::DeployError;

const USER_AGENT: &str = concat!("shipyard/", env!("CARGO_PKG_VERSION"));

/// Lifetime of management tokens signed from a management secret
const TOKEN_TTL_SECS: i64 = 5 * 60;

const DEPLOY_MUTATION: &str = r#"
mutation($name: String!, $stage: String!, $types: String!, $dryRun: Boolean, $secrets: [String!], $subscriptions: [FunctionInput!], $force: Boolean, $noMigration: Boolean) {
  deploy(input: {name: $name, stage: $stage, types: $types, dryRun: $dryRun, secrets: $secrets, subscriptions: $subscriptions, force: $force, noMigration: $noMigration}) {
    errors { type field description }
    warnings { type field description }
    steps { type name model }
    migration { revision steps { type name model } }
  }
}"#;

const MIGRATION_QUERY: &str = r#"
query($name: String!, $stage: String!) {
  migrationStatus(name: $name, stage: $stage) { applied status errors }
}"#;

const PROJECT_QUERY: &str = r#"
query($name: String!, $stage: String!) {
  project(name: $name, stage: $stage) { name stage }
}"#;

const ADD_PROJECT_MUTATION: &str = r#"
mutation($name: String!, $stage: String!, $secrets: [String!]) {
  addProject(input: {name: $name, stage: $stage, secrets: $secrets}) {
    project { name stage }
  }
}"#;

const SERVER_INFO_QUERY: &str = "{ serverInfo { version } }";

const IMPORT_MUTATION: &str = r#"
mutation($name: String!, $stage: String!, $data: Json!) {
  importData(name: $name, stage: $stage, data: $data) { imported }
}"#;

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Serialize)]
struct ManagementClaims {
    grants: Vec<Grant>,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize)]
struct Grant {
    target: &'static str,
    action: &'static str,
}

/// Bearer token for a cluster.
///
/// Cloud clusters take the session key as is; self-hosted clusters get a
/// short-lived HS256 token signed with the management secret.
pub fn management_token(cluster: &Cluster) -> Result<Option<String>, DeployError> {
    let Some(secret) = cluster.secret.as_deref() else {
        return Ok(None);
    };
    if cluster.shared || cluster.is_private {
        return Ok(Some(secret.to_string()));
    }
    let now = chrono::Utc::now().timestamp();
    let claims = ManagementClaims {
        grants: vec![Grant {
            target: "*/*",
            action: "*",
        }],
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map(Some)
    .map_err(|e| DeployError::Login(format!("Failed to sign management token: {}", e)))
}

/// Management API client for one cluster
pub struct GraphqlClient {
    client: Client,
    management_url: String,
    token: Option<String>,
}

impl GraphqlClient {
    pub fn new(cluster: &Cluster, timeout: Duration) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            management_url: cluster.management_url(),
            token: management_token(cluster)?,
        })
    }

    pub fn management_url(&self) -> &str {
        &self.management_url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, DeployError> {
        debug!("POST {}", self.management_url);

        let mut request = self
            .client
            .post(&self.management_url)
            .json(&GraphqlRequest { query, variables });
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Management API request failed: {} - {}", status, body);
            return Err(DeployError::Graphql(format!("{}: {}", status, body)));
        }

        let body: GraphqlResponse<T> = response.json().await?;
        if !body.errors.is_empty() {
            let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(DeployError::Graphql(messages.join("\n")));
        }
        body.data
            .ok_or_else(|| DeployError::Graphql("Response contained no data".to_string()))
    }
}

#[derive(Deserialize)]
struct DeployData {
    deploy: DeployPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MigrationData {
    migration_status: MigrationStatusSnapshot,
}

#[derive(Deserialize)]
struct ProjectData {
    project: Option<Project>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddProjectData {
    add_project: ProjectData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoData {
    server_info: ServerInfo,
}

#[derive(Deserialize)]
struct ServerInfo {
    version: Option<String>,
}

#[async_trait]
impl ClusterApi for GraphqlClient {
    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeployPayload, DeployError> {
        let variables = json!({
            "name": request.identity.name,
            "stage": request.identity.stage,
            "types": request.data_model,
            "dryRun": request.dry_run,
            "secrets": request.secrets,
            "subscriptions": request.subscriptions,
            "force": request.force,
            "noMigration": request.no_migrate,
        });
        let data: DeployData = self.request(DEPLOY_MUTATION, variables).await?;
        Ok(data.deploy)
    }

    async fn get_migration(
        &self,
        identity: &ProjectIdentity,
    ) -> Result<MigrationStatusSnapshot, DeployError> {
        let variables = json!({ "name": identity.name, "stage": identity.stage });
        let data: MigrationData = self.request(MIGRATION_QUERY, variables).await?;
        Ok(data.migration_status)
    }

    async fn get_project(&self, identity: &ProjectIdentity) -> Result<Project, DeployError> {
        let variables = json!({ "name": identity.name, "stage": identity.stage });
        let data: ProjectData = self.request(PROJECT_QUERY, variables).await?;
        data.project
            .ok_or_else(|| DeployError::Graphql(format!("Project {} not found", identity)))
    }

    async fn add_project(
        &self,
        identity: &ProjectIdentity,
        secrets: Option<&[String]>,
    ) -> Result<Project, DeployError> {
        let variables = json!({
            "name": identity.name,
            "stage": identity.stage,
            "secrets": secrets,
        });
        let data: AddProjectData = self.request(ADD_PROJECT_MUTATION, variables).await?;
        data.add_project
            .project
            .ok_or_else(|| DeployError::Graphql(format!("Project {} was not created", identity)))
    }

    async fn server_version(&self) -> Result<Option<String>, DeployError> {
        let data: ServerInfoData = self.request(SERVER_INFO_QUERY, json!({})).await?;
        Ok(data.server_info.version)
    }

    async fn import_data(
        &self,
        identity: &ProjectIdentity,
        data: &Value,
    ) -> Result<(), DeployError> {
        let variables = json!({
            "name": identity.name,
            "stage": identity.stage,
            "data": data,
        });
        let _: IgnoredAny = self.request(IMPORT_MUTATION, variables).await?;
        Ok(())
    }
}

/// Connects to clusters over HTTP
#[derive(Debug, Clone)]
pub struct GraphqlConnector {
    timeout: Duration,
    online_timeout: Duration,
}

impl Default for GraphqlConnector {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            online_timeout: Duration::from_secs(5),
        }
    }
}

impl GraphqlConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClusterConnector for GraphqlConnector {
    async fn is_online(&self, cluster: &Cluster) -> bool {
        let client = match GraphqlClient::new(cluster, self.online_timeout) {
            Ok(client) => client,
            Err(e) => {
                debug!("Could not build reachability client for {}: {}", cluster.base_url, e);
                return false;
            }
        };
        match client.server_version().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Cluster {} is not reachable: {}", cluster.base_url, e);
                false
            }
        }
    }

    fn connect(&self, cluster: &Cluster) -> Result<Box<dyn ClusterApi>, DeployError> {
        Ok(Box::new(GraphqlClient::new(cluster, self.timeout)?))
    }
}
