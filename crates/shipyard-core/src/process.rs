//! Child process execution for hooks and seed scripts.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

/// Captured result of running a child process to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code, `None` when the process was killed by a signal or never started
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Spawn-level failure (program not found, permission denied, ...)
    pub error: Option<String>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.error.is_none() && self.status == Some(0)
    }

    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self {
            status: None,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(message.into()),
        }
    }
}

/// Runs a program with arguments and waits for it to finish.
///
/// Never returns an error: spawn failures are reported in
/// [`ProcessOutcome::error`] so callers decide whether they are fatal.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> ProcessOutcome;
}

/// Spawns real child processes with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemProcessRunner {
    working_dir: Option<PathBuf>,
}

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run processes from the given directory (the definition's directory).
    pub fn in_dir(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(working_dir.into()),
        }
    }
}

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> ProcessOutcome {
        debug!("Spawning {} {:?}", program, args);

        let mut command = tokio::process::Command::new(program);
        command.args(args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        match command.output().await {
            Ok(output) => ProcessOutcome {
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                error: None,
            },
            Err(e) => ProcessOutcome::spawn_failed(format!("Failed to run {}: {}", program, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success_requires_zero_exit() {
        let ok = ProcessOutcome {
            status: Some(0),
            ..Default::default()
        };
        let failed = ProcessOutcome {
            status: Some(2),
            ..Default::default()
        };
        assert!(ok.success());
        assert!(!failed.success());
        assert!(!ProcessOutcome::spawn_failed("nope").success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let runner = SystemProcessRunner::new();
        let outcome = runner.run("echo", &["hello".to_string()]).await;
        assert!(outcome.success());
        assert_eq!(outcome.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_system_runner_reports_missing_program() {
        let runner = SystemProcessRunner::new();
        let outcome = runner
            .run("shipyard-definitely-not-a-program", &[])
            .await;
        assert!(!outcome.success());
        assert!(outcome.error.is_some());
    }
}
