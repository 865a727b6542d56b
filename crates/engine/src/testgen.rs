//! Test synthesis — the bounded generate/check/revise state machine
//! for a policy item's test file.
//!
//! States: `DRAFTING(trial=0)` → `SYNTAX_CHECK` → {`RUN`, `REVISE`} →
//! `RUN` → {`ACCEPTED`, `REVISE`}, terminal `ACCEPTED` or `EXHAUSTED`.
//! Trial 0 generates fresh from the stub and policy item; every later
//! trial is conditioned on the immediately preceding artifact and the
//! newest error list only.

use crate::debug::{DebugStore, TrialKind};
use crate::prompts;
use crate::scaffold::test_file_name;
use guardsmith_core::artifact::SourceArtifact;
use guardsmith_core::codegen::{CodeGenerator, extract_source};
use guardsmith_core::domain::Domain;
use guardsmith_core::error::{GenerationError, Result};
use guardsmith_core::policy::PolicyItem;
use guardsmith_core::toolchain::{RunMode, StaticChecker, TestRunner};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Error fed back when a candidate collects zero tests — a
/// syntactically valid but vacuous file is a degenerate completion,
/// not a success.
const EMPTY_TEST_SET: &str = "empty set of generated unit tests is not allowed";

pub struct TestSynthesizer {
    generator: Arc<dyn CodeGenerator>,
    checker: Arc<dyn StaticChecker>,
    runner: Arc<dyn TestRunner>,
    debug: DebugStore,
    max_trials: u32,
}

impl TestSynthesizer {
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        checker: Arc<dyn StaticChecker>,
        runner: Arc<dyn TestRunner>,
        debug: DebugStore,
        max_trials: u32,
    ) -> Self {
        Self {
            generator,
            checker,
            runner,
            debug,
            max_trials,
        }
    }

    /// Drive the state machine to an accepted test artifact, or raise
    /// `TestSynthesisExhausted` once the trial budget is spent.
    ///
    /// The run step executes in collection-only mode: against the
    /// still-no-op stub guard, assertions are meaningless — the
    /// candidate only has to be importable and non-empty.
    pub async fn synthesize(
        &self,
        domain: &Domain,
        tool: &str,
        item: &PolicyItem,
        stub: &SourceArtifact,
        dependencies: &BTreeSet<String>,
        work_dir: &Path,
    ) -> Result<SourceArtifact> {
        let base_ctx = prompts::test_synthesis(domain, tool, item, &stub.content, dependencies);
        let file_name = test_file_name(tool, &item.name);

        let mut previous: Option<SourceArtifact> = None;
        let mut errors: Vec<String> = Vec::new();

        for trial in 0..self.max_trials {
            let ctx = match &previous {
                None => base_ctx.clone(),
                Some(prev) => base_ctx.clone().revising(prev.content.clone(), errors.clone()),
            };

            let completion = self.generator.generate(&ctx).await?;
            let source = extract_source(&completion)?;
            let candidate = SourceArtifact::new(file_name.clone(), source);
            candidate.save(work_dir)?;

            let check = self.checker.check(work_dir, &candidate).await?;
            if !check.is_clean() {
                errors = check.error_messages();
                self.debug
                    .record(tool, &item.name, TrialKind::Tests, trial, &candidate, &errors);
                warn!(
                    tool,
                    item = %item.name,
                    trial,
                    errors = errors.len(),
                    "Test candidate failed static check"
                );
                previous = Some(candidate);
                continue;
            }

            let run = self
                .runner
                .run(work_dir, &candidate, RunMode::CollectOnly)
                .await?;
            if !run.collected_ok {
                errors = run.failures.clone();
                self.debug
                    .record(tool, &item.name, TrialKind::Tests, trial, &candidate, &errors);
                warn!(tool, item = %item.name, trial, "Test candidate failed collection");
                previous = Some(candidate);
                continue;
            }
            if run.test_count == 0 {
                errors = vec![EMPTY_TEST_SET.to_string()];
                self.debug
                    .record(tool, &item.name, TrialKind::Tests, trial, &candidate, &errors);
                warn!(tool, item = %item.name, trial, "Test candidate collected zero tests");
                previous = Some(candidate);
                continue;
            }

            self.debug
                .record(tool, &item.name, TrialKind::Tests, trial, &candidate, &[]);
            info!(
                tool,
                item = %item.name,
                trial,
                tests = run.test_count,
                "Test artifact accepted"
            );
            return Ok(candidate);
        }

        debug!(tool, item = %item.name, "Test synthesis budget exhausted");
        Err(GenerationError::TestSynthesisExhausted {
            tool: tool.to_string(),
            item: item.name.clone(),
            trials: self.max_trials,
        }
        .into())
    }
}
