//! Migration status polling.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::client::{ClusterApi, MigrationStatusSnapshot};
use crate::cluster::ProjectIdentity;
use crate::error::DeployError;

/// Default delay between two status fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default bound on how long a migration may take
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// `None` polls until the cluster reports a terminal state
    pub max_wait: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_WAIT),
        }
    }
}

impl PollOptions {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// Polls the migration of one project until it settles.
pub struct MigrationPoller<'a> {
    api: &'a dyn ClusterApi,
    options: PollOptions,
}

impl<'a> MigrationPoller<'a> {
    pub fn new(api: &'a dyn ClusterApi, options: PollOptions) -> Self {
        Self { api, options }
    }

    /// Fetch the migration status until `applied == expected` or a terminal
    /// status is reported, calling `on_progress(applied, expected)` after
    /// every unsettled fetch.
    ///
    /// Any server-side migration error fails immediately with
    /// [`DeployError::MigrationFailure`].
    pub async fn poll_until_terminal(
        &self,
        identity: &ProjectIdentity,
        expected: usize,
        mut on_progress: impl FnMut(u32, usize) + Send,
    ) -> Result<MigrationStatusSnapshot, DeployError> {
        let started = Instant::now();
        let mut fetches = 0usize;

        loop {
            let snapshot = self.api.get_migration(identity).await?;
            fetches += 1;

            if !snapshot.errors.is_empty() {
                return Err(DeployError::MigrationFailure {
                    messages: snapshot.errors.join("\n"),
                });
            }

            if snapshot.is_settled(expected) {
                debug!(
                    "Migration of {} settled with {} after {} fetch(es)",
                    identity,
                    snapshot.status.as_str(),
                    fetches
                );
                return Ok(snapshot);
            }

            on_progress(snapshot.applied, expected);

            if let Some(max_wait) = self.options.max_wait {
                let waited = started.elapsed();
                if waited >= max_wait {
                    return Err(DeployError::PollingTimeout { waited });
                }
            }

            tokio::time::sleep(self.options.interval).await;
        }
    }
}

/// Progress suffix shown while a migration is applied
pub fn progress(applied: u32, expected: usize) -> String {
    format!("({}/{})", applied, expected)
}
