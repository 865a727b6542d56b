//! Static type checking via mypy.
//!
//! Runs `python -m mypy` from the provisioned virtualenv against one
//! saved artifact and converts its per-line diagnostics into a
//! `CheckReport`. Concurrent checks of different artifacts are safe:
//! mypy is invoked per file with incremental caching disabled, and the
//! virtualenv is read-only.

use crate::venv::VirtualEnv;
use async_trait::async_trait;
use guardsmith_core::artifact::SourceArtifact;
use guardsmith_core::error::ToolchainError;
use guardsmith_core::toolchain::{CheckDiagnostic, CheckReport, Severity, StaticChecker};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Arguments for every mypy invocation. `--no-incremental` keeps
/// concurrent checks from racing on a shared `.mypy_cache`; the
/// incremental cache does not support concurrent writers.
const MYPY_ARGS: [&str; 3] = ["--no-error-summary", "--no-color-output", "--no-incremental"];

/// mypy adapter implementing the `StaticChecker` collaborator.
pub struct MypyChecker {
    env: VirtualEnv,
    timeout: Duration,
}

impl MypyChecker {
    pub fn new(env: VirtualEnv, timeout: Duration) -> Self {
        Self { env, timeout }
    }

    /// Parse mypy's line-oriented output into diagnostics.
    ///
    /// Lines look like `file.py:12: error: Name "x" is not defined`.
    /// The trailing summary line ("Found N errors in ...") is skipped.
    fn parse_output(stdout: &str) -> CheckReport {
        let mut diagnostics = Vec::new();

        for line in stdout.lines() {
            let severity = if line.contains(": error:") {
                Severity::Error
            } else if line.contains(": warning:") {
                Severity::Warning
            } else if line.contains(": note:") {
                Severity::Note
            } else {
                continue;
            };

            diagnostics.push(CheckDiagnostic {
                message: line.trim().to_string(),
                severity,
            });
        }

        let error_count = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();

        CheckReport {
            error_count,
            diagnostics,
        }
    }
}

#[async_trait]
impl StaticChecker for MypyChecker {
    async fn check(
        &self,
        dir: &Path,
        artifact: &SourceArtifact,
    ) -> Result<CheckReport, ToolchainError> {
        let target = artifact.path(dir);
        debug!(file = %target.display(), "Running mypy");

        let mut command = Command::new(self.env.interpreter());
        command
            .args(["-m", "mypy"])
            .args(MYPY_ARGS)
            .arg(&target)
            .current_dir(dir);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ToolchainError::Timeout {
                tool: "mypy".into(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ToolchainError::Spawn {
                tool: "mypy".into(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = Self::parse_output(&stdout);

        debug!(
            file = %target.display(),
            errors = report.error_count,
            "mypy finished"
        );
        Ok(report)
    }
}
