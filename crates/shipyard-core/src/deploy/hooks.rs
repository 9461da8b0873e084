//! Post-deploy hook execution.

use tracing::debug;

use crate::output::{Output, Tone};
use crate::process::ProcessRunner;
use crate::util::split_command;

/// Result of one hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReport {
    pub command: String,
    pub success: bool,
}

/// Runs hook command lines one after another.
///
/// A failing hook is reported and the next one still runs.
pub struct HookRunner<'a> {
    runner: &'a dyn ProcessRunner,
}

impl<'a> HookRunner<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self { runner }
    }

    pub async fn run_post_deploy(
        &self,
        hooks: &[String],
        skip: bool,
        out: &mut dyn Output,
    ) -> Vec<HookReport> {
        if skip {
            debug!("Hooks are disabled by the --skip-hooks flag");
            return Vec::new();
        }
        if hooks.is_empty() {
            return Vec::new();
        }

        out.log("");
        out.line(Tone::Bold, "post-deploy:");

        let mut reports = Vec::with_capacity(hooks.len());
        for hook in hooks {
            let Some((program, args)) = split_command(hook) else {
                debug!("Skipping empty hook");
                continue;
            };

            out.action_start(&format!("Running {}", hook));
            let outcome = self.runner.run(&program, &args).await;

            if !outcome.stderr.is_empty() {
                out.line(Tone::Error, outcome.stderr.trim_end());
            }
            if !outcome.stdout.is_empty() {
                out.log(outcome.stdout.trim_end());
            }

            let success = outcome.success();
            if success {
                out.action_stop("done");
            } else {
                if let Some(error) = &outcome.error {
                    out.line(Tone::Error, error);
                }
                out.action_stop("✖");
            }

            reports.push(HookReport {
                command: hook.clone(),
                success,
            });
        }
        reports
    }
}
