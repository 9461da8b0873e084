//! Cluster management API client.
//!
//! The orchestration talks to clusters only through [`ClusterApi`] and
//! creates clients through [`ClusterConnector`], so tests substitute
//! in-memory fakes.

pub mod graphql;
pub mod types;

use async_trait::async_trait;

use crate::cluster::{Cluster, ProjectIdentity};
use crate::error::DeployError;

pub use graphql::{GraphqlClient, GraphqlConnector};
pub use types::{
    ChangeStep, DeployPayload, DeploymentRequest, ErrorDescriptor, MigrationDescriptor,
    MigrationStatus, MigrationStatusSnapshot, Project, WarningDescriptor,
};

/// Operations the orchestration performs against one cluster.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Submit a deployment (or dry run).
    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeployPayload, DeployError>;

    /// Fetch the status of the latest migration of a project.
    async fn get_migration(
        &self,
        identity: &ProjectIdentity,
    ) -> Result<MigrationStatusSnapshot, DeployError>;

    /// Look a project up; not-found is an error.
    async fn get_project(&self, identity: &ProjectIdentity) -> Result<Project, DeployError>;

    /// Create a project with its secrets.
    async fn add_project(
        &self,
        identity: &ProjectIdentity,
        secrets: Option<&[String]>,
    ) -> Result<Project, DeployError>;

    /// Version string of the cluster server, if it reports one.
    async fn server_version(&self) -> Result<Option<String>, DeployError>;

    /// Import seed data into a project.
    async fn import_data(
        &self,
        identity: &ProjectIdentity,
        data: &serde_json::Value,
    ) -> Result<(), DeployError>;
}

/// Creates clients for clusters and checks reachability.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    /// Whether the cluster answers at all.
    async fn is_online(&self, cluster: &Cluster) -> bool;

    /// Build a client for the cluster, authenticated with `cluster.secret`.
    fn connect(&self, cluster: &Cluster) -> Result<Box<dyn ClusterApi>, DeployError>;
}
