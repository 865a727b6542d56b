//! Shared test helpers for the engine's state-machine tests.

use async_trait::async_trait;
use guardsmith_core::artifact::SourceArtifact;
use guardsmith_core::codegen::{CodeGenerator, PromptContext};
use guardsmith_core::domain::{Domain, MethodSpec, ParamSpec};
use guardsmith_core::error::{ProviderError, ToolchainError};
use guardsmith_core::policy::{PolicyItem, ToolPolicy};
use guardsmith_core::toolchain::{
    CheckDiagnostic, CheckReport, RunMode, Severity, StaticChecker, TestReport, TestRunner,
};
use std::path::Path;
use std::sync::Mutex;

/// A two-tool airline domain: one mutating booking operation, one
/// read-only lookup.
pub fn sample_domain() -> Domain {
    Domain {
        types_module: SourceArtifact::new(
            "airline_types.py",
            "class PaymentMethod: ...\nclass Reservation: ...\nclass User: ...\n",
        ),
        api_interface: SourceArtifact::new("airline_api.py", "class AirlineApi: ...\n"),
        interface_name: "AirlineApi".into(),
        impl_class_name: "AirlineApiImpl".into(),
        methods: vec![
            MethodSpec {
                name: "book_reservation".into(),
                params: vec![
                    ParamSpec {
                        name: "user_id".into(),
                        type_name: "str".into(),
                    },
                    ParamSpec {
                        name: "payment_methods".into(),
                        type_name: "list[PaymentMethod]".into(),
                    },
                ],
                return_type: "Reservation".into(),
                doc: "Book a new reservation.".into(),
                read_only: false,
            },
            MethodSpec {
                name: "get_user_details".into(),
                params: vec![ParamSpec {
                    name: "user_id".into(),
                    type_name: "str".into(),
                }],
                return_type: "User".into(),
                doc: "Fetch a user profile, including membership tier.".into(),
                read_only: true,
            },
        ],
    }
}

/// A booking policy with two items: an argument-only payment rule and a
/// rule that needs the user's membership tier.
pub fn sample_policy() -> ToolPolicy {
    ToolPolicy {
        tool_name: "book_reservation".into(),
        policy_items: vec![
            PolicyItem {
                name: "payment_limits".into(),
                description: "At most one credit card, one certificate, and three gift cards per reservation.".into(),
                references: vec![],
                compliance_examples: vec!["One credit card and two gift cards.".into()],
                violation_examples: vec!["Two credit cards.".into()],
            },
            PolicyItem {
                name: "membership_tier".into(),
                description: "Premium cabins may only be booked by gold-tier members.".into(),
                references: vec![],
                compliance_examples: vec!["A gold member books a premium cabin.".into()],
                violation_examples: vec!["A silver member books a premium cabin.".into()],
            },
        ],
    }
}

/// A code generator that returns a sequence of scripted completions.
///
/// The last completion repeats once the script runs out, so bounded
/// loops can call it an arbitrary number of times. Counts calls.
pub struct ScriptedGenerator {
    completions: Mutex<Vec<String>>,
    calls: Mutex<usize>,
    fail_always: bool,
}

impl ScriptedGenerator {
    pub fn new(completions: Vec<&str>) -> Self {
        assert!(!completions.is_empty(), "need at least one completion");
        Self {
            completions: Mutex::new(completions.into_iter().map(String::from).collect()),
            calls: Mutex::new(0),
            fail_always: false,
        }
    }

    /// Returns the same completion on every call.
    pub fn repeating(completion: &str) -> Self {
        Self::new(vec![completion])
    }

    /// Fails every call with a network error.
    pub fn failing() -> Self {
        Self {
            completions: Mutex::new(vec![String::new()]),
            calls: Mutex::new(0),
            fail_always: true,
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CodeGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn generate(&self, _ctx: &PromptContext) -> Result<String, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if self.fail_always {
            return Err(ProviderError::Network("scripted failure".into()));
        }
        let completions = self.completions.lock().unwrap();
        let index = (*calls - 1).min(completions.len() - 1);
        Ok(completions[index].clone())
    }
}

/// A static checker that returns a sequence of scripted reports (last
/// one repeats). Counts calls.
pub struct StubChecker {
    reports: Mutex<Vec<CheckReport>>,
    calls: Mutex<usize>,
}

impl StubChecker {
    pub fn new(reports: Vec<CheckReport>) -> Self {
        assert!(!reports.is_empty(), "need at least one report");
        Self {
            reports: Mutex::new(reports),
            calls: Mutex::new(0),
        }
    }

    pub fn always_clean() -> Self {
        Self::new(vec![CheckReport::clean()])
    }

    pub fn always_errors(message: &str) -> Self {
        Self::new(vec![error_report(message)])
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl StaticChecker for StubChecker {
    async fn check(
        &self,
        _dir: &Path,
        _artifact: &SourceArtifact,
    ) -> Result<CheckReport, ToolchainError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        let reports = self.reports.lock().unwrap();
        let index = (*calls - 1).min(reports.len() - 1);
        Ok(reports[index].clone())
    }
}

/// A test runner that returns a sequence of scripted reports (last one
/// repeats). Counts calls.
pub struct StubRunner {
    reports: Mutex<Vec<TestReport>>,
    calls: Mutex<usize>,
}

impl StubRunner {
    pub fn new(reports: Vec<TestReport>) -> Self {
        assert!(!reports.is_empty(), "need at least one report");
        Self {
            reports: Mutex::new(reports),
            calls: Mutex::new(0),
        }
    }

    pub fn always_green(test_count: usize) -> Self {
        Self::new(vec![green_report(test_count)])
    }

    pub fn always_failing(message: &str) -> Self {
        Self::new(vec![failing_report(message)])
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl TestRunner for StubRunner {
    async fn run(
        &self,
        _dir: &Path,
        _artifact: &SourceArtifact,
        _mode: RunMode,
    ) -> Result<TestReport, ToolchainError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        let reports = self.reports.lock().unwrap();
        let index = (*calls - 1).min(reports.len() - 1);
        Ok(reports[index].clone())
    }
}

pub fn error_report(message: &str) -> CheckReport {
    CheckReport {
        error_count: 1,
        diagnostics: vec![CheckDiagnostic {
            message: message.into(),
            severity: Severity::Error,
        }],
    }
}

pub fn green_report(test_count: usize) -> TestReport {
    TestReport {
        collected_ok: true,
        failures: vec![],
        test_count,
    }
}

pub fn failing_report(message: &str) -> TestReport {
    TestReport {
        collected_ok: true,
        failures: vec![message.into()],
        test_count: 2,
    }
}

pub fn empty_collection_report() -> TestReport {
    TestReport {
        collected_ok: true,
        failures: vec![],
        test_count: 0,
    }
}
