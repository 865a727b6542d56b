//! Build orchestration — fan-out, failure containment, and manifest
//! assembly.
//!
//! All participating tools run concurrently, and all policy items
//! within a tool run concurrently. Items are independent units of work
//! with no shared mutable state; each item's outcome is captured as a
//! value (never a propagated panic/exception), so one item's failure
//! can never abort its siblings. The orchestrator's contract is to
//! always complete a `BuildResult`, even a partially degraded one —
//! the only exception is a missing policy/domain join, which is a
//! fatal configuration error raised before any generation work.

use crate::debug::DebugStore;
use crate::deps::DependencyAnalyzer;
use crate::guardgen::GuardSynthesizer;
use crate::scaffold::{Scaffold, Scaffolder};
use crate::testgen::TestSynthesizer;
use chrono::Utc;
use futures::future::join_all;
use guardsmith_config::BudgetConfig;
use guardsmith_core::artifact::SourceArtifact;
use guardsmith_core::codegen::CodeGenerator;
use guardsmith_core::domain::Domain;
use guardsmith_core::error::{Error, Result};
use guardsmith_core::policy::{PolicyItem, ToolPolicy};
use guardsmith_core::result::{BuildResult, GenerationResult, ToolGuardResult};
use guardsmith_core::toolchain::{StaticChecker, TestRunner};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// File name of the persisted run manifest, under the output root.
pub const MANIFEST_FILE: &str = "build_manifest.json";

pub struct BuildOrchestrator {
    deps: DependencyAnalyzer,
    testgen: TestSynthesizer,
    guardgen: GuardSynthesizer,
    out_dir: PathBuf,
}

impl BuildOrchestrator {
    /// Wire the orchestrator from shared collaborator handles.
    ///
    /// The checker and runner must already be bound to a provisioned
    /// environment; provisioning happens once, before any concurrent
    /// generation work, and the environment is read-only afterwards.
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        checker: Arc<dyn StaticChecker>,
        runner: Arc<dyn TestRunner>,
        budgets: &BudgetConfig,
        out_dir: impl Into<PathBuf>,
        debug_dir: impl Into<PathBuf>,
    ) -> Self {
        let debug = DebugStore::new(debug_dir);
        Self {
            deps: DependencyAnalyzer::new(generator.clone()),
            testgen: TestSynthesizer::new(
                generator.clone(),
                checker.clone(),
                runner.clone(),
                debug.clone(),
                budgets.test_gen_trials,
            ),
            guardgen: GuardSynthesizer::new(
                generator,
                checker,
                runner,
                debug,
                budgets.tool_improvements,
                budgets.syntax_repair_trials,
            ),
            out_dir: out_dir.into(),
        }
    }

    /// Directory holding every generated guard, test, and support
    /// module; also the working directory for checks and test runs.
    pub fn guards_dir(&self) -> PathBuf {
        self.out_dir.join("guards")
    }

    /// Run the whole pipeline and persist the manifest.
    pub async fn build(&self, domain: &Domain, policies: &[ToolPolicy]) -> Result<BuildResult> {
        let started_at = Utc::now();
        let guards_dir = self.guards_dir();

        // Shared modules generated code imports; written before fan-out.
        Scaffolder::support_module().save(&guards_dir)?;
        domain.types_module.save(&guards_dir)?;
        domain.api_interface.save(&guards_dir)?;

        // Two policy files naming the same tool would overwrite each
        // other's artifacts on disk and silently last-win in the
        // manifest; refuse the run before any generation work.
        let mut seen = BTreeSet::new();
        for policy in policies {
            if !seen.insert(policy.tool_name.as_str()) {
                return Err(Error::Config {
                    message: format!("duplicate policy for tool '{}'", policy.tool_name),
                });
            }
        }

        let participating: Vec<&ToolPolicy> =
            policies.iter().filter(|p| p.has_items()).collect();
        info!(
            tools = participating.len(),
            skipped = policies.len() - participating.len(),
            "Starting guard build"
        );

        let tool_results = join_all(
            participating
                .iter()
                .map(|policy| self.build_tool(domain, policy, &guards_dir)),
        )
        .await;

        let mut tools = BTreeMap::new();
        for result in tool_results {
            let tool_result = result?;
            tools.insert(tool_result.policy.tool_name.clone(), tool_result);
        }

        let build = BuildResult {
            types_module: domain.types_module.file_name.clone(),
            api_interface: domain.api_interface.file_name.clone(),
            started_at,
            finished_at: Utc::now(),
            tools,
        };

        let manifest_path = self.out_dir.join(MANIFEST_FILE);
        build.manifest().save(&manifest_path)?;
        info!(manifest = %manifest_path.display(), "Guard build complete");
        Ok(build)
    }

    /// Scaffold one tool, then drive every policy item concurrently.
    ///
    /// Only the scaffolder's fail-fast join check can raise here; all
    /// per-item failures are contained in [`Self::build_item`].
    async fn build_tool(
        &self,
        domain: &Domain,
        policy: &ToolPolicy,
        guards_dir: &Path,
    ) -> Result<ToolGuardResult> {
        let scaffold = Scaffolder::scaffold(domain, policy, guards_dir)?;

        let outcomes = join_all(
            policy
                .policy_items
                .iter()
                .zip(&scaffold.item_stubs)
                .map(|(item, stub)| {
                    self.build_item(domain, &policy.tool_name, item, stub, guards_dir)
                }),
        )
        .await;

        Ok(Self::assemble(policy, scaffold, outcomes))
    }

    /// One policy item's pipeline with three-tier degradation:
    /// full success → guard-without-tests → stub-passthrough.
    async fn build_item(
        &self,
        domain: &Domain,
        tool: &str,
        item: &PolicyItem,
        stub: &SourceArtifact,
        guards_dir: &Path,
    ) -> GenerationResult {
        let dependencies = self.deps.analyze(domain, tool, item).await;

        match self
            .testgen
            .synthesize(domain, tool, item, stub, &dependencies, guards_dir)
            .await
        {
            Ok(tests) => {
                match self
                    .guardgen
                    .synthesize(domain, tool, item, stub, &tests, &dependencies, guards_dir)
                    .await
                {
                    Ok(guard) => GenerationResult {
                        test_artifact: Some(tests),
                        guard_artifact: Some(guard),
                    },
                    Err(e) => {
                        warn!(tool, item = %item.name, error = %e, "Green loop failed, degrading");
                        self.degraded(domain, tool, item, stub, &dependencies, guards_dir)
                            .await
                    }
                }
            }
            Err(e) => {
                warn!(tool, item = %item.name, error = %e, "Test synthesis failed, degrading");
                self.degraded(domain, tool, item, stub, &dependencies, guards_dir)
                    .await
            }
        }
    }

    /// The reduced fallback: one guard generation without test-driven
    /// feedback. If that also fails, the trial-0 stub stays on disk as
    /// the effective guard and the item is recorded as a passthrough.
    async fn degraded(
        &self,
        domain: &Domain,
        tool: &str,
        item: &PolicyItem,
        stub: &SourceArtifact,
        dependencies: &BTreeSet<String>,
        guards_dir: &Path,
    ) -> GenerationResult {
        match self
            .guardgen
            .generate_unverified(domain, tool, item, stub, dependencies, guards_dir)
            .await
        {
            Ok(guard) => GenerationResult {
                test_artifact: None,
                guard_artifact: Some(guard),
            },
            Err(e) => {
                warn!(
                    tool,
                    item = %item.name,
                    error = %e,
                    "Unverified generation failed too, keeping stub passthrough"
                );
                // Restore the stub: a failed revision may have
                // overwritten the guard file with broken content.
                if let Err(e) = stub.save(guards_dir) {
                    warn!(tool, item = %item.name, error = %e, "Failed to restore stub");
                }
                GenerationResult::default()
            }
        }
    }

    fn assemble(
        policy: &ToolPolicy,
        scaffold: Scaffold,
        outcomes: Vec<GenerationResult>,
    ) -> ToolGuardResult {
        let mut item_guards = Vec::with_capacity(outcomes.len());
        let mut item_tests = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            item_guards.push(outcome.guard_artifact);
            item_tests.push(outcome.test_artifact);
        }

        ToolGuardResult {
            policy: policy.clone(),
            guard_fn_name: scaffold.guard_fn_name,
            guard_artifact: scaffold.tool_guard,
            item_guards,
            item_tests,
        }
    }
}
