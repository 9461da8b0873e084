//! Shipyard Core Library
//!
//! Provides the deployment orchestration for service definitions: target
//! resolution, submission, migration polling, hooks, generation and seeding.

pub mod client;
pub mod cluster;
pub mod definition;
pub mod deploy;
pub mod error;
pub mod info;
pub mod output;
pub mod process;
pub mod util;

/// Re-exports of commonly used types
pub mod prelude {
    // Definition
    pub use crate::definition::{DefinitionStore, ServiceDefinition};

    // Cluster
    pub use crate::cluster::{Cluster, ClusterEnvironment, ProjectIdentity};

    // Client
    pub use crate::client::{ClusterApi, ClusterConnector, DeployPayload, GraphqlConnector};

    // Deploy
    pub use crate::deploy::{DeployCommand, DeployOptions, DeployOutcome, load_definition};
    pub use crate::info::{ServiceInfo, service_info};

    // Errors and output
    pub use crate::error::DeployError;
    pub use crate::output::{MemoryOutput, Output};
}
