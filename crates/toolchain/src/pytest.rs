//! Test execution via pytest.
//!
//! Runs `python -m pytest` from the provisioned virtualenv against one
//! saved test artifact. Supports collection-only mode, which is enough
//! to validate that a generated test file is importable and non-empty
//! without running assertions.

use crate::venv::VirtualEnv;
use async_trait::async_trait;
use guardsmith_core::artifact::SourceArtifact;
use guardsmith_core::error::ToolchainError;
use guardsmith_core::toolchain::{RunMode, TestReport, TestRunner};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// pytest exit code for "no tests were collected".
const EXIT_NO_TESTS: i32 = 5;

/// pytest adapter implementing the `TestRunner` collaborator.
pub struct PytestRunner {
    env: VirtualEnv,
    timeout: Duration,
}

impl PytestRunner {
    pub fn new(env: VirtualEnv, timeout: Duration) -> Self {
        Self { env, timeout }
    }

    /// Parse `pytest -q --collect-only` output.
    ///
    /// Collected test ids are the `file::test_name` lines; a collection
    /// error shows up as exit code 2 plus `ERROR` lines.
    fn parse_collect(stdout: &str, exit_code: i32) -> TestReport {
        let test_count = stdout
            .lines()
            .filter(|line| line.contains("::") && !line.starts_with("ERROR"))
            .count();

        let mut failures: Vec<String> = stdout
            .lines()
            .filter(|line| line.starts_with("ERROR") || line.contains("errors during collection"))
            .map(|line| line.trim().to_string())
            .collect();

        let collected_ok = (exit_code == 0 || exit_code == EXIT_NO_TESTS) && failures.is_empty();

        // An INTERNALERROR traceback or usage error carries no ERROR
        // line; feed the output tail back so the revision prompt is
        // never empty-handed.
        if !collected_ok && failures.is_empty() {
            failures = vec![output_tail(stdout)];
        }

        TestReport {
            collected_ok,
            failures,
            test_count,
        }
    }

    /// Parse `pytest -q` output from a full run.
    ///
    /// Per-test failures are the `FAILED file::test - message` summary
    /// lines; the final `N passed, M failed in ...` line gives the
    /// collected count.
    fn parse_run(stdout: &str, exit_code: i32) -> TestReport {
        let mut failures: Vec<String> = stdout
            .lines()
            .filter(|line| line.starts_with("FAILED") || line.starts_with("ERROR"))
            .map(|line| line.trim().to_string())
            .collect();

        let mut test_count = 0usize;
        for line in stdout.lines() {
            let line = line.trim();
            if !(line.contains("passed") || line.contains("failed") || line.contains("error")) {
                continue;
            }
            let mut tokens = line
                .trim_start_matches('=')
                .trim_end_matches('=')
                .trim()
                .split([' ', ','])
                .filter(|t| !t.is_empty())
                .peekable();
            let mut counted = 0usize;
            while let Some(token) = tokens.next() {
                if let Ok(n) = token.parse::<usize>() {
                    if matches!(tokens.peek(), Some(&"passed" | &"failed" | &"error" | &"errors")) {
                        counted += n;
                    }
                }
            }
            if counted > 0 {
                test_count = counted;
            }
        }

        // Exit code 1 is "tests ran, some failed"; anything above that
        // is a usage/collection error.
        let collected_ok = exit_code <= 1;

        if !collected_ok && failures.is_empty() {
            failures = vec![output_tail(stdout)];
        }

        TestReport {
            collected_ok,
            failures,
            test_count,
        }
    }

    async fn invoke(&self, dir: &Path, args: &[&str]) -> Result<(String, i32), ToolchainError> {
        let mut command = Command::new(self.env.interpreter());
        command.args(["-m", "pytest", "-q"]).args(args).current_dir(dir);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ToolchainError::Timeout {
                tool: "pytest".into(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ToolchainError::Spawn {
                tool: "pytest".into(),
                reason: e.to_string(),
            })?;

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            stdout.push('\n');
            stdout.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        Ok((stdout, output.status.code().unwrap_or(-1)))
    }
}

/// The last few non-empty lines of pytest output, as one message.
fn output_tail(stdout: &str) -> String {
    let lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let tail = &lines[lines.len().saturating_sub(5)..];
    if tail.is_empty() {
        "pytest produced no output".to_string()
    } else {
        tail.join("\n")
    }
}

#[async_trait]
impl TestRunner for PytestRunner {
    async fn run(
        &self,
        dir: &Path,
        artifact: &SourceArtifact,
        mode: RunMode,
    ) -> Result<TestReport, ToolchainError> {
        let file = artifact.file_name.as_str();
        debug!(file, ?mode, "Running pytest");

        let report = match mode {
            RunMode::CollectOnly => {
                let (stdout, code) = self.invoke(dir, &["--collect-only", file]).await?;
                Self::parse_collect(&stdout, code)
            }
            RunMode::Full => {
                let (stdout, code) = self.invoke(dir, &["-rf", file]).await?;
                Self::parse_run(&stdout, code)
            }
        };

        debug!(
            file,
            collected_ok = report.collected_ok,
            tests = report.test_count,
            failures = report.failures.len(),
            "pytest finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_counts_test_ids() {
        let stdout = "\
test_payment_limits.py::test_two_credit_cards_raises
test_payment_limits.py::test_one_card_two_gift_cards_passes

2 tests collected in 0.01s
";
        let report = PytestRunner::parse_collect(stdout, 0);
        assert!(report.collected_ok);
        assert_eq!(report.test_count, 2);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn collect_detects_import_errors() {
        let stdout = "\
ERROR test_payment_limits.py - ModuleNotFoundError: No module named 'guards'
1 error in 0.02s
";
        let report = PytestRunner::parse_collect(stdout, 2);
        assert!(!report.collected_ok);
        assert_eq!(report.test_count, 0);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn collect_of_empty_file_is_ok_but_zero() {
        let report = PytestRunner::parse_collect("no tests ran in 0.00s\n", EXIT_NO_TESTS);
        assert!(report.collected_ok);
        assert_eq!(report.test_count, 0);
    }

    #[test]
    fn collection_crash_without_error_lines_reports_output_tail() {
        let stdout = "\
INTERNALERROR> Traceback (most recent call last):
INTERNALERROR>   File \"_pytest/main.py\", line 271, in wrap_session
INTERNALERROR> RecursionError: maximum recursion depth exceeded
";
        let report = PytestRunner::parse_collect(stdout, 3);
        assert!(!report.collected_ok);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("RecursionError"));

        let report = PytestRunner::parse_run(stdout, 3);
        assert!(!report.collected_ok);
        assert!(report.failures[0].contains("RecursionError"));
    }

    #[test]
    fn silent_crash_still_yields_a_failure_message() {
        let report = PytestRunner::parse_collect("", 4);
        assert!(!report.collected_ok);
        assert_eq!(report.failures, vec!["pytest produced no output"]);
    }

    #[test]
    fn run_extracts_failure_lines_and_count() {
        let stdout = "\
.F                                                                       [100%]
FAILED test_payment_limits.py::test_two_credit_cards_raises - Failed: DID NOT RAISE PolicyViolation
1 failed, 1 passed in 0.05s
";
        let report = PytestRunner::parse_run(stdout, 1);
        assert!(report.collected_ok);
        assert_eq!(report.test_count, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("DID NOT RAISE"));
        assert!(!report.passed());
    }

    #[test]
    fn green_run_passes() {
        let report = PytestRunner::parse_run("2 passed in 0.03s\n", 0);
        assert!(report.passed());
        assert_eq!(report.test_count, 2);
    }
}
