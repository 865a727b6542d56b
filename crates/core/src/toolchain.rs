//! Static-check and test-execution collaborator traits.
//!
//! Both run an external tool against a saved artifact inside a
//! pre-provisioned environment; both are potentially slow I/O and are
//! therefore async suspension points for the repair loops.

use crate::artifact::SourceArtifact;
use crate::error::ToolchainError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Diagnostic severity, per the static checker's own classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// One diagnostic from the static checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDiagnostic {
    pub message: String,
    pub severity: Severity,
}

/// The outcome of one static/type check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub error_count: usize,
    pub diagnostics: Vec<CheckDiagnostic>,
}

impl CheckReport {
    pub fn clean() -> Self {
        Self {
            error_count: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }

    /// Error messages only, in report order — the review-comment list
    /// fed back into the next repair trial.
    pub fn error_messages(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.clone())
            .collect()
    }
}

/// How the test runner should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Collect tests without running assertions. Sufficient to verify
    /// the generated file is importable and non-empty; against a no-op
    /// stub guard, assertions would be meaningless anyway.
    CollectOnly,
    /// Run the full test suite.
    Full,
}

/// The outcome of one test-runner invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    /// Whether collection itself succeeded (imports resolved, no
    /// syntax errors at load time).
    pub collected_ok: bool,

    /// Failure/error messages, one per failing test or load error.
    pub failures: Vec<String>,

    /// Number of tests collected.
    pub test_count: usize,
}

impl TestReport {
    pub fn passed(&self) -> bool {
        self.collected_ok && self.failures.is_empty()
    }
}

/// Static/type-check collaborator.
#[async_trait]
pub trait StaticChecker: Send + Sync {
    /// Check the saved artifact under `dir`.
    async fn check(
        &self,
        dir: &Path,
        artifact: &SourceArtifact,
    ) -> Result<CheckReport, ToolchainError>;
}

/// Test-execution collaborator.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Execute (or collect) the saved test artifact under `dir`.
    async fn run(
        &self,
        dir: &Path,
        artifact: &SourceArtifact,
        mode: RunMode,
    ) -> Result<TestReport, ToolchainError>;
}
