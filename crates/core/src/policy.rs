//! Tool policy data model.
//!
//! A `ToolPolicy` is the structured output of the upstream policy
//! extraction pipeline: one tool operation plus the ordered list of
//! atomic rules that constrain calls to it. Policies are read-only
//! inputs to guard generation — the pipeline never mutates them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One atomic, independently testable rule extracted from a policy
/// document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyItem {
    /// Unique slug within the tool (e.g. "payment_method_limits").
    pub name: String,

    /// The natural-language rule the guard must enforce.
    pub description: String,

    /// Verbatim excerpts from the source policy document.
    #[serde(default)]
    pub references: Vec<String>,

    /// Scenarios that must NOT raise a violation.
    #[serde(default)]
    pub compliance_examples: Vec<String>,

    /// Scenarios that MUST raise a violation.
    #[serde(default)]
    pub violation_examples: Vec<String>,
}

/// An API operation and the ordered set of policy items that constrain
/// calls to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolPolicy {
    /// Must match an abstract method name in the domain API surface.
    pub tool_name: String,

    /// Ordered; per-item artifacts are positionally aligned with this list.
    #[serde(default)]
    pub policy_items: Vec<PolicyItem>,
}

impl ToolPolicy {
    /// Parse a policy from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a single policy file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Load every `*.json` policy in a directory, sorted by file name
    /// for a stable tool ordering.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>> {
        if !dir.is_dir() {
            return Err(Error::Config {
                message: format!("policy directory not found: {}", dir.display()),
            });
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::load(p)).collect()
    }

    /// A tool without policy items gets no guard at all.
    pub fn has_items(&self) -> bool {
        !self.policy_items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "tool_name": "book_reservation",
            "policy_items": [
                {
                    "name": "payment_method_limits",
                    "description": "At most one credit card, one certificate, and three gift cards per reservation.",
                    "references": ["Payments: each reservation may use up to one credit card..."],
                    "compliance_examples": ["One credit card and two gift cards."],
                    "violation_examples": ["Two credit cards."]
                }
            ]
        }"#
    }

    #[test]
    fn parses_policy_json() {
        let policy = ToolPolicy::from_json(sample_json()).unwrap();
        assert_eq!(policy.tool_name, "book_reservation");
        assert_eq!(policy.policy_items.len(), 1);
        assert_eq!(policy.policy_items[0].name, "payment_method_limits");
        assert_eq!(policy.policy_items[0].violation_examples.len(), 1);
        assert!(policy.has_items());
    }

    #[test]
    fn missing_example_lists_default_to_empty() {
        let policy = ToolPolicy::from_json(
            r#"{"tool_name": "get_user", "policy_items": [{"name": "a", "description": "b"}]}"#,
        )
        .unwrap();
        assert!(policy.policy_items[0].compliance_examples.is_empty());
        assert!(policy.policy_items[0].references.is_empty());
    }

    #[test]
    fn loads_policies_sorted_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b_tool.json"),
            r#"{"tool_name": "b_tool", "policy_items": []}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a_tool.json"),
            r#"{"tool_name": "a_tool", "policy_items": []}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let policies = ToolPolicy::load_dir(dir.path()).unwrap();
        let names: Vec<_> = policies.iter().map(|p| p.tool_name.as_str()).collect();
        assert_eq!(names, vec!["a_tool", "b_tool"]);
        assert!(!policies[0].has_items());
    }
}
