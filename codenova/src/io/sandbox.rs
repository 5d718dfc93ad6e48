//! Local runner for JavaScript.
//!
//! Code never runs inside this process. Each run gets a fresh temporary
//! directory and a child interpreter with a cleared environment, closed stdin,
//! a wall-clock limit and a heap cap. The directory is removed when the run's
//! [`TempDir`] drops, on every exit path.

use std::fs;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::core::normalize::LocalOutcome;
use crate::io::config::SandboxConfig;
use crate::io::process::{ProcessOutput, run_with_limits};

const SCRIPT_NAME: &str = "main.js";

/// Executes source text locally and captures what it printed.
pub trait LocalExecutor {
    /// Run `source`. Failures are reported in [`LocalOutcome::thrown`], never as a panic.
    fn execute(&self, source: &str) -> LocalOutcome;
}

/// Child-process sandbox driven by [`SandboxConfig`].
#[derive(Debug, Clone)]
pub struct LocalSandboxRunner {
    config: SandboxConfig,
}

impl LocalSandboxRunner {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    fn run(&self, source: &str) -> Result<ProcessOutput> {
        let workdir = TempDir::with_prefix("codenova-run-").context("create sandbox dir")?;
        let script = workdir.path().join(SCRIPT_NAME);
        fs::write(&script, source)
            .with_context(|| format!("write script {}", script.display()))?;

        let (program, args) = self
            .config
            .command
            .split_first()
            .context("sandbox command is empty")?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(format!("--max-old-space-size={}", self.config.memory_mb))
            .arg(SCRIPT_NAME)
            .current_dir(workdir.path())
            .env_clear();
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }

        run_with_limits(
            cmd,
            Duration::from_secs(self.config.timeout_secs),
            self.config.output_limit_bytes,
        )
    }
}

impl LocalExecutor for LocalSandboxRunner {
    #[instrument(skip_all, fields(bytes = source.len()))]
    fn execute(&self, source: &str) -> LocalOutcome {
        let output = match self.run(source) {
            Ok(output) => output,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "sandbox failed to start");
                return LocalOutcome {
                    thrown: Some(format!("{err:#}")),
                    ..LocalOutcome::default()
                };
            }
        };

        let stdout = output.stdout_text();
        let stderr = output.stderr_text();
        if output.timed_out {
            info!(timeout_secs = self.config.timeout_secs, "script timed out");
            return LocalOutcome {
                stdout,
                stderr,
                thrown: Some(format!(
                    "Execution timed out after {} s",
                    self.config.timeout_secs
                )),
            };
        }
        if !output.status.success() {
            debug!(exit_code = ?output.status.code(), "script failed");
            let message = last_error_line(&stderr).unwrap_or_else(|| match output.status.code() {
                Some(code) => format!("Script exited with code {code}"),
                None => "Script was terminated".to_string(),
            });
            return LocalOutcome {
                stdout,
                stderr,
                thrown: Some(message),
            };
        }
        LocalOutcome {
            stdout,
            stderr,
            thrown: None,
        }
    }
}

/// The line that names the uncaught error, e.g. `ReferenceError: x is not defined`.
fn last_error_line(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines
        .iter()
        .find(|l| !l.starts_with("at ") && l.contains("Error"))
        .or_else(|| lines.last())
        .map(|l| (*l).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_line_prefers_named_error() {
        let stderr = "/tmp/x/main.js:1\nfoo();\n^\n\nReferenceError: foo is not defined\n    at Object.<anonymous> (/tmp/x/main.js:1:1)\n\nNode.js v20.0.0\n";
        assert_eq!(
            last_error_line(stderr).as_deref(),
            Some("ReferenceError: foo is not defined")
        );
        assert_eq!(last_error_line("   \n"), None);
        assert_eq!(last_error_line("boom\n").as_deref(), Some("boom"));
    }

    #[test]
    fn missing_interpreter_reports_thrown() {
        let runner = LocalSandboxRunner::new(SandboxConfig {
            command: vec!["definitely-not-node-codenova".to_string()],
            ..SandboxConfig::default()
        });
        let outcome = runner.execute("console.log(1)");
        assert!(outcome.thrown.is_some());
        assert!(outcome.stdout.is_empty());
    }

    #[cfg(unix)]
    fn sh_runner(timeout_secs: u64) -> LocalSandboxRunner {
        // `sh -c <script> <memory-flag> main.js` runs the inline script with the
        // generated arguments as positional parameters.
        LocalSandboxRunner::new(SandboxConfig {
            command: vec!["sh".to_string(), "-c".to_string(), String::new()],
            timeout_secs,
            ..SandboxConfig::default()
        })
    }

    #[cfg(unix)]
    fn with_script(runner: LocalSandboxRunner, script: &str) -> LocalSandboxRunner {
        let mut config = runner.config().clone();
        config.command[2] = script.to_string();
        LocalSandboxRunner::new(config)
    }

    #[cfg(unix)]
    #[test]
    fn captures_output_and_runs_in_scratch_dir() {
        let runner = with_script(sh_runner(10), "cat \"$1\"; echo; pwd >&2");
        let outcome = runner.execute("hello from script");
        assert_eq!(outcome.thrown, None);
        assert_eq!(outcome.stdout, "hello from script\n");
        let dir = outcome.stderr.trim().to_string();
        assert!(dir.contains("codenova-run-"), "{dir}");
        assert!(!std::path::Path::new(&dir).exists(), "sandbox dir not removed");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_thrown_with_partial_output() {
        let runner = with_script(sh_runner(10), "echo partial; echo 'TypeError: nope' >&2; exit 1");
        let outcome = runner.execute("");
        assert_eq!(outcome.stdout, "partial\n");
        assert_eq!(outcome.thrown.as_deref(), Some("TypeError: nope"));
    }

    #[cfg(unix)]
    #[test]
    fn environment_is_cleared() {
        let runner = with_script(sh_runner(10), "echo \"${HOME:-unset}\"");
        let outcome = runner.execute("");
        assert_eq!(outcome.stdout, "unset\n");
    }

    #[cfg(unix)]
    #[test]
    fn runaway_script_times_out() {
        let runner = with_script(sh_runner(1), "exec sleep 5");
        let outcome = runner.execute("");
        assert_eq!(
            outcome.thrown.as_deref(),
            Some("Execution timed out after 1 s")
        );
    }
}
