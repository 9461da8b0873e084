//! Error types for deployment orchestration

use std::time::Duration;

use thiserror::Error;

/// Documentation link printed with validation errors and warnings
pub const FORCE_FLAG_DOCS: &str = "https://github.com/shipyard-dev/shipyard/blob/main/docs/deploy.md#force";

/// Main error type for a deploy run
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("{0}")]
    Configuration(String),

    #[error("Could not connect to server at {base_url}. Please check if your server is running.")]
    UnreachableCluster { base_url: String },

    #[error("Deployment canceled because of {count} error(s)")]
    DeploymentValidation { count: usize },

    #[error("Deployment canceled because of {count} unaccepted warning(s)")]
    UnforcedWarnings { count: usize },

    #[error(
        "The Migration failed and has not been performed. This is very likely not a transient issue.\n{messages}"
    )]
    MigrationFailure { messages: String },

    #[error("Migration did not reach a terminal state within {}s", waited.as_secs())]
    PollingTimeout { waited: Duration },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("Definition error: {0:#}")]
    Definition(#[from] anyhow::Error),

    #[error("Seed error: {0}")]
    Seed(String),

    #[error("Generate error: {0}")]
    Generate(String),

    #[error("Login error: {0}")]
    Login(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Whether the reporter already printed the details of this error.
    ///
    /// Frontends use this to avoid printing the payload twice.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            DeployError::DeploymentValidation { .. } | DeployError::UnforcedWarnings { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failure_message_keeps_server_errors() {
        let err = DeployError::MigrationFailure {
            messages: "column missing\nrollback done".to_string(),
        };
        let text = err.to_string();
        assert!(text.starts_with("The Migration failed"));
        assert!(text.ends_with("column missing\nrollback done"));
    }

    #[test]
    fn test_reported_errors() {
        assert!(DeployError::DeploymentValidation { count: 1 }.is_reported());
        assert!(DeployError::UnforcedWarnings { count: 2 }.is_reported());
        assert!(!DeployError::Configuration("x".into()).is_reported());
    }

    #[test]
    fn test_polling_timeout_message() {
        let err = DeployError::PollingTimeout {
            waited: Duration::from_secs(90),
        };
        assert_eq!(
            err.to_string(),
            "Migration did not reach a terminal state within 90s"
        );
    }
}
