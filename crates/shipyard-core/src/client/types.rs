//! Request and response types of the cluster management API.

use serde::{Deserialize, Serialize};

use crate::cluster::ProjectIdentity;
use crate::definition::SubscriptionInput;

/// Everything submitted for one deployment. Built once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub identity: ProjectIdentity,
    pub data_model: String,
    pub subscriptions: Vec<SubscriptionInput>,
    pub secrets: Option<Vec<String>>,
    pub dry_run: bool,
    pub force: bool,
    pub no_migrate: bool,
}

/// Validation error or warning reported by the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub field: Option<String>,
    pub description: String,
}

/// Warnings share the error shape
pub type WarningDescriptor = ErrorDescriptor;

/// One structural change computed by the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStep {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Migration created by a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationDescriptor {
    pub revision: i64,
    #[serde(default)]
    pub steps: Vec<ChangeStep>,
}

/// Result of a deploy call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployPayload {
    #[serde(default)]
    pub errors: Vec<ErrorDescriptor>,
    #[serde(default)]
    pub warnings: Vec<WarningDescriptor>,
    #[serde(default)]
    pub steps: Option<Vec<ChangeStep>>,
    #[serde(default)]
    pub migration: Option<MigrationDescriptor>,
}

impl DeployPayload {
    /// Steps to display: top-level `steps`, else `migration.steps`, else none.
    pub fn resolved_steps(&self) -> &[ChangeStep] {
        self.steps
            .as_deref()
            .or_else(|| self.migration.as_ref().map(|m| m.steps.as_slice()))
            .unwrap_or(&[])
    }

    /// The migration to poll, if the cluster is applying a real one.
    pub fn pending_migration(&self, dry_run: bool) -> Option<&MigrationDescriptor> {
        self.migration
            .as_ref()
            .filter(|migration| migration.revision > 0 && !dry_run)
    }
}

/// Status of a migration on the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MigrationStatus {
    Pending,
    InProgress,
    Success,
    RollbackSuccess,
    RollbackFailure,
    Unknown(String),
}

impl MigrationStatus {
    /// Success and both rollback outcomes end a migration.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MigrationStatus::Success
                | MigrationStatus::RollbackSuccess
                | MigrationStatus::RollbackFailure
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            MigrationStatus::Pending => "PENDING",
            MigrationStatus::InProgress => "IN_PROGRESS",
            MigrationStatus::Success => "SUCCESS",
            MigrationStatus::RollbackSuccess => "ROLLBACK_SUCCESS",
            MigrationStatus::RollbackFailure => "ROLLBACK_FAILURE",
            MigrationStatus::Unknown(other) => other,
        }
    }
}

impl From<String> for MigrationStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => MigrationStatus::Pending,
            "IN_PROGRESS" => MigrationStatus::InProgress,
            "SUCCESS" => MigrationStatus::Success,
            "ROLLBACK_SUCCESS" => MigrationStatus::RollbackSuccess,
            "ROLLBACK_FAILURE" => MigrationStatus::RollbackFailure,
            _ => MigrationStatus::Unknown(value),
        }
    }
}

impl From<MigrationStatus> for String {
    fn from(value: MigrationStatus) -> Self {
        value.as_str().to_string()
    }
}

/// One poll result of a running migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatusSnapshot {
    pub applied: u32,
    pub status: MigrationStatus,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl MigrationStatusSnapshot {
    /// Whether this snapshot ends polling for a migration of `expected` steps.
    ///
    /// Errors are checked separately; they fail the run instead.
    pub fn is_settled(&self, expected: usize) -> bool {
        self.applied as usize == expected || self.status.is_terminal()
    }

    /// Whether the migration completed in a way that warrants client generation.
    pub fn is_success(&self, expected: usize) -> bool {
        (self.errors.is_empty() && self.applied as usize == expected)
            || self.status == MigrationStatus::Success
    }
}

/// A project (service stage) on a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub stage: String,
}
