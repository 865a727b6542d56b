//! Guard synthesis — the "green loop".
//!
//! Outer states: `CHECK` → {`GREEN`, `IMPROVE`} → `CHECK`, bounded by
//! the improvement budget. Each `IMPROVE` regenerates the guard's full
//! content from the previous guard plus the accumulated review
//! comments (static-check errors and test failures), then runs an
//! inner syntax-repair loop of the same shape as test synthesis before
//! re-entering `CHECK`.
//!
//! The guard's signature never changes across revisions: the
//! orchestrating tool guard already binds to the trial-0 shape, so
//! every regeneration prompt pins it. That invariant is enforced by
//! construction, not by a post-hoc check.

use crate::debug::{DebugStore, TrialKind};
use crate::prompts;
use crate::scaffold::{Scaffolder, item_guard_fn_name};
use guardsmith_core::artifact::SourceArtifact;
use guardsmith_core::codegen::{CodeGenerator, PromptContext, extract_source};
use guardsmith_core::domain::Domain;
use guardsmith_core::error::{GenerationError, Result};
use guardsmith_core::policy::PolicyItem;
use guardsmith_core::toolchain::{RunMode, StaticChecker, TestRunner};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GuardSynthesizer {
    generator: Arc<dyn CodeGenerator>,
    checker: Arc<dyn StaticChecker>,
    runner: Arc<dyn TestRunner>,
    debug: DebugStore,
    max_improvements: u32,
    max_syntax_trials: u32,
}

impl GuardSynthesizer {
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        checker: Arc<dyn StaticChecker>,
        runner: Arc<dyn TestRunner>,
        debug: DebugStore,
        max_improvements: u32,
        max_syntax_trials: u32,
    ) -> Self {
        Self {
            generator,
            checker,
            runner,
            debug,
            max_improvements,
            max_syntax_trials,
        }
    }

    /// Drive the green loop until the accepted tests pass against the
    /// current guard, or raise `GuardSynthesisExhausted` once the
    /// improvement budget is spent.
    ///
    /// Precondition: `stub` is saved under `work_dir` (trial 0) and
    /// `tests` is an accepted test artifact.
    pub async fn synthesize(
        &self,
        domain: &Domain,
        tool: &str,
        item: &PolicyItem,
        stub: &SourceArtifact,
        tests: &SourceArtifact,
        dependencies: &BTreeSet<String>,
        work_dir: &Path,
    ) -> Result<SourceArtifact> {
        let base_ctx = self.base_context(domain, tool, item, dependencies)?;
        let mut guard = stub.clone();

        for improvement in 0..self.max_improvements {
            let report = self.runner.run(work_dir, tests, RunMode::Full).await?;
            if report.passed() {
                info!(tool, item = %item.name, improvement, "Green loop converged");
                return Ok(guard);
            }

            let mut comments = report.failures;
            if !report.collected_ok {
                comments.push("test file could not be collected against this guard".into());
            }
            debug!(
                tool,
                item = %item.name,
                improvement,
                failures = comments.len(),
                "Tests failing, improving guard"
            );

            guard = self
                .regenerate(
                    &base_ctx,
                    tool,
                    item,
                    &guard,
                    comments,
                    TrialKind::Guard(improvement),
                    work_dir,
                )
                .await?;
        }

        warn!(tool, item = %item.name, "Guard improvement budget exhausted");
        Err(GenerationError::GuardSynthesisExhausted {
            tool: tool.to_string(),
            item: item.name.clone(),
            trials: self.max_improvements,
        }
        .into())
    }

    /// The degraded fallback: one unconditional generation with an
    /// empty review-comment list, still syntax-checked, but never run
    /// against tests. Produces a materially different artifact than
    /// passing the stub through unchanged; the manifest records it as
    /// unverified either way.
    pub async fn generate_unverified(
        &self,
        domain: &Domain,
        tool: &str,
        item: &PolicyItem,
        stub: &SourceArtifact,
        dependencies: &BTreeSet<String>,
        work_dir: &Path,
    ) -> Result<SourceArtifact> {
        let base_ctx = self.base_context(domain, tool, item, dependencies)?;
        self.regenerate(
            &base_ctx,
            tool,
            item,
            stub,
            Vec::new(),
            TrialKind::UnverifiedGuard,
            work_dir,
        )
        .await
    }

    fn base_context(
        &self,
        domain: &Domain,
        tool: &str,
        item: &PolicyItem,
        dependencies: &BTreeSet<String>,
    ) -> Result<PromptContext> {
        let method = domain.require_method(tool)?;
        let signature =
            Scaffolder::render_signature(&item_guard_fn_name(tool, &item.name), domain, method);
        Ok(prompts::guard_synthesis(
            domain,
            tool,
            item,
            &signature,
            dependencies,
        ))
    }

    /// Inner syntax-repair loop: regenerate from the previous guard and
    /// comment list, re-checking statically until clean or the inner
    /// budget is spent.
    async fn regenerate(
        &self,
        base_ctx: &PromptContext,
        tool: &str,
        item: &PolicyItem,
        previous: &SourceArtifact,
        comments: Vec<String>,
        kind: TrialKind,
        work_dir: &Path,
    ) -> Result<SourceArtifact> {
        let mut previous = previous.clone();
        let mut comments = comments;

        for trial in 0..self.max_syntax_trials {
            let ctx = base_ctx
                .clone()
                .revising(previous.content.clone(), comments.clone());
            let completion = self.generator.generate(&ctx).await?;
            let source = extract_source(&completion)?;
            let candidate = previous.with_content(source);
            candidate.save(work_dir)?;

            let check = self.checker.check(work_dir, &candidate).await?;
            if check.is_clean() {
                self.debug
                    .record(tool, &item.name, kind, trial, &candidate, &[]);
                return Ok(candidate);
            }

            comments = check.error_messages();
            self.debug
                .record(tool, &item.name, kind, trial, &candidate, &comments);
            warn!(
                tool,
                item = %item.name,
                trial,
                errors = comments.len(),
                "Guard candidate failed static check"
            );
            previous = candidate;
        }

        Err(GenerationError::GuardSynthesisExhausted {
            tool: tool.to_string(),
            item: item.name.clone(),
            trials: self.max_syntax_trials,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use guardsmith_core::error::Error;
    use guardsmith_core::toolchain::TestReport;

    const GUARD_CODE: &str = "```python\ndef guard():\n    raise_if_bad()\n```";

    fn synthesizer(
        generator: Arc<ScriptedGenerator>,
        checker: Arc<StubChecker>,
        runner: Arc<StubRunner>,
        debug_root: &Path,
    ) -> GuardSynthesizer {
        GuardSynthesizer::new(generator, checker, runner, DebugStore::new(debug_root), 5, 3)
    }

    fn stub() -> SourceArtifact {
        SourceArtifact::new(
            "guard_book_reservation_payment_limits.py",
            "def guard(...):\n    pass\n",
        )
    }

    fn tests_artifact() -> SourceArtifact {
        SourceArtifact::new("test_book_reservation_payment_limits.py", "def test_a(): ...")
    }

    #[tokio::test]
    async fn stub_already_green_needs_no_generation() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::repeating(GUARD_CODE));
        let runner = Arc::new(StubRunner::always_green(2));
        let synth = synthesizer(
            generator.clone(),
            Arc::new(StubChecker::always_clean()),
            runner,
            dir.path(),
        );

        let domain = sample_domain();
        let policy = sample_policy();
        let guard = synth
            .synthesize(
                &domain,
                "book_reservation",
                &policy.policy_items[0],
                &stub(),
                &tests_artifact(),
                &BTreeSet::new(),
                dir.path(),
            )
            .await
            .unwrap();

        assert_eq!(guard, stub());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn check_step_is_idempotent_over_the_same_artifact_pair() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::repeating(GUARD_CODE));
        let runner = Arc::new(StubRunner::always_green(2));
        let synth = synthesizer(
            generator.clone(),
            Arc::new(StubChecker::always_clean()),
            runner.clone(),
            dir.path(),
        );

        let domain = sample_domain();
        let policy = sample_policy();

        // The check step is a pure function of the guard/test pair:
        // repeating it over unchanged artifacts must yield the same
        // outcome and never trigger a generation.
        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let guard = synth
                .synthesize(
                    &domain,
                    "book_reservation",
                    &policy.policy_items[0],
                    &stub(),
                    &tests_artifact(),
                    &BTreeSet::new(),
                    dir.path(),
                )
                .await
                .unwrap();
            outcomes.push(guard);
        }

        assert_eq!(outcomes[0], outcomes[1]);
        assert_eq!(generator.call_count(), 0);
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn improves_once_then_converges() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::repeating(GUARD_CODE));
        let runner = Arc::new(StubRunner::new(vec![
            failing_report("FAILED test_a - DID NOT RAISE"),
            green_report(2),
        ]));
        let synth = synthesizer(
            generator.clone(),
            Arc::new(StubChecker::always_clean()),
            runner.clone(),
            dir.path(),
        );

        let domain = sample_domain();
        let policy = sample_policy();
        let guard = synth
            .synthesize(
                &domain,
                "book_reservation",
                &policy.policy_items[0],
                &stub(),
                &tests_artifact(),
                &BTreeSet::new(),
                dir.path(),
            )
            .await
            .unwrap();

        // Signature-stable: the revision keeps the stub's file name.
        assert_eq!(guard.file_name, stub().file_name);
        assert!(guard.content.contains("raise_if_bad"));
        assert_eq!(generator.call_count(), 1);
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausts_outer_budget_at_exactly_the_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::repeating(GUARD_CODE));
        let runner = Arc::new(StubRunner::always_failing("FAILED test_a"));
        let synth = synthesizer(
            generator.clone(),
            Arc::new(StubChecker::always_clean()),
            runner.clone(),
            dir.path(),
        );

        let domain = sample_domain();
        let policy = sample_policy();
        let err = synth
            .synthesize(
                &domain,
                "book_reservation",
                &policy.policy_items[0],
                &stub(),
                &tests_artifact(),
                &BTreeSet::new(),
                dir.path(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Generation(GenerationError::GuardSynthesisExhausted { trials: 5, .. })
        ));
        // Five CHECK→IMPROVE cycles: five test runs, five regenerations.
        assert_eq!(runner.call_count(), 5);
        assert_eq!(generator.call_count(), 5);
    }

    #[tokio::test]
    async fn inner_syntax_loop_exhausts_at_its_own_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::repeating(GUARD_CODE));
        let checker = Arc::new(StubChecker::always_errors("type error"));
        let runner = Arc::new(StubRunner::always_failing("FAILED test_a"));
        let synth = synthesizer(generator.clone(), checker.clone(), runner, dir.path());

        let domain = sample_domain();
        let policy = sample_policy();
        let err = synth
            .synthesize(
                &domain,
                "book_reservation",
                &policy.policy_items[0],
                &stub(),
                &tests_artifact(),
                &BTreeSet::new(),
                dir.path(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Generation(GenerationError::GuardSynthesisExhausted { trials: 3, .. })
        ));
        // The first IMPROVE burns the whole inner budget.
        assert_eq!(generator.call_count(), 3);
        assert_eq!(checker.call_count(), 3);
    }

    #[tokio::test]
    async fn unverified_generation_skips_tests_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::repeating(GUARD_CODE));
        let runner = Arc::new(StubRunner::new(vec![TestReport {
            collected_ok: false,
            failures: vec!["should never run".into()],
            test_count: 0,
        }]));
        let synth = synthesizer(
            generator.clone(),
            Arc::new(StubChecker::always_clean()),
            runner.clone(),
            dir.path(),
        );

        let domain = sample_domain();
        let policy = sample_policy();
        let guard = synth
            .generate_unverified(
                &domain,
                "book_reservation",
                &policy.policy_items[0],
                &stub(),
                &BTreeSet::new(),
                dir.path(),
            )
            .await
            .unwrap();

        assert!(guard.content.contains("raise_if_bad"));
        assert_eq!(generator.call_count(), 1);
        assert_eq!(runner.call_count(), 0);
    }
}
