//! Write-once result aggregates and the persisted build manifest.
//!
//! Assembled strictly after the constituent generation steps settle
//! (success, degraded, or raised), then serialized as a single JSON
//! document — the pipeline's externally visible output. Degradation is
//! visible structurally: which fields are populated tells an operator
//! how far each item got, with no separate error-log field.

use crate::artifact::SourceArtifact;
use crate::error::Result;
use crate::policy::ToolPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Per-item generation outcome. Either artifact may be absent to record
/// a degraded result instead of failing the whole tool.
#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    pub test_artifact: Option<SourceArtifact>,
    pub guard_artifact: Option<SourceArtifact>,
}

/// How far one policy item's generation pipeline got.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemTier {
    /// Guard generated and proven green by its own generated tests.
    Verified,
    /// Guard generated once without test-driven feedback.
    Unverified,
    /// All generation attempts failed; the trial-0 no-op stub remains
    /// the effective guard.
    StubPassthrough,
}

/// The unit of work per tool: the orchestrating guard plus per-item
/// artifacts, positionally aligned with the tool's policy items.
#[derive(Debug, Clone)]
pub struct ToolGuardResult {
    pub policy: ToolPolicy,
    pub guard_fn_name: String,
    pub guard_artifact: SourceArtifact,
    pub item_guards: Vec<Option<SourceArtifact>>,
    pub item_tests: Vec<Option<SourceArtifact>>,
}

impl ToolGuardResult {
    pub fn item_tier(&self, index: usize) -> ItemTier {
        match (
            self.item_guards.get(index).map(|g| g.is_some()),
            self.item_tests.get(index).map(|t| t.is_some()),
        ) {
            (Some(true), Some(true)) => ItemTier::Verified,
            (Some(true), _) => ItemTier::Unverified,
            _ => ItemTier::StubPassthrough,
        }
    }
}

/// The terminal manifest of a full run.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub types_module: String,
    pub api_interface: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tools: BTreeMap<String, ToolGuardResult>,
}

impl BuildResult {
    /// The serializable view persisted to disk.
    pub fn manifest(&self) -> BuildManifest {
        let tools = self
            .tools
            .iter()
            .map(|(name, result)| {
                let manifest = ToolManifest {
                    guard_file: result.guard_artifact.file_name.clone(),
                    guard_fn_name: result.guard_fn_name.clone(),
                    item_names: result
                        .policy
                        .policy_items
                        .iter()
                        .map(|i| i.name.clone())
                        .collect(),
                    item_guard_files: result
                        .item_guards
                        .iter()
                        .map(|g| g.as_ref().map(|a| a.file_name.clone()))
                        .collect(),
                    item_test_files: result
                        .item_tests
                        .iter()
                        .map(|t| t.as_ref().map(|a| a.file_name.clone()))
                        .collect(),
                };
                (name.clone(), manifest)
            })
            .collect();

        BuildManifest {
            types_module: self.types_module.clone(),
            api_interface: self.api_interface.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            tools,
        }
    }
}

/// Per-tool entry in the persisted manifest. Null per-item entries mark
/// degraded outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolManifest {
    pub guard_file: String,
    pub guard_fn_name: String,
    pub item_names: Vec<String>,
    pub item_guard_files: Vec<Option<String>>,
    pub item_test_files: Vec<Option<String>>,
}

impl ToolManifest {
    pub fn item_tier(&self, index: usize) -> ItemTier {
        match (
            self.item_guard_files.get(index).map(|g| g.is_some()),
            self.item_test_files.get(index).map(|t| t.is_some()),
        ) {
            (Some(true), Some(true)) => ItemTier::Verified,
            (Some(true), _) => ItemTier::Unverified,
            _ => ItemTier::StubPassthrough,
        }
    }
}

/// The persisted run manifest — a single JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildManifest {
    pub types_module: String,
    pub api_interface: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tools: BTreeMap<String, ToolManifest>,
}

impl BuildManifest {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyItem;

    fn sample_result() -> ToolGuardResult {
        ToolGuardResult {
            policy: ToolPolicy {
                tool_name: "book_reservation".into(),
                policy_items: vec![
                    PolicyItem {
                        name: "payment_limits".into(),
                        description: "d".into(),
                        references: vec![],
                        compliance_examples: vec![],
                        violation_examples: vec![],
                    },
                    PolicyItem {
                        name: "membership_check".into(),
                        description: "d".into(),
                        references: vec![],
                        compliance_examples: vec![],
                        violation_examples: vec![],
                    },
                    PolicyItem {
                        name: "baggage_allowance".into(),
                        description: "d".into(),
                        references: vec![],
                        compliance_examples: vec![],
                        violation_examples: vec![],
                    },
                ],
            },
            guard_fn_name: "guard_book_reservation".into(),
            guard_artifact: SourceArtifact::new("guard_book_reservation.py", "..."),
            item_guards: vec![
                Some(SourceArtifact::new("guard_payment_limits.py", "...")),
                Some(SourceArtifact::new("guard_membership_check.py", "...")),
                None,
            ],
            item_tests: vec![
                Some(SourceArtifact::new("test_payment_limits.py", "...")),
                None,
                None,
            ],
        }
    }

    #[test]
    fn tiers_follow_populated_fields() {
        let result = sample_result();
        assert_eq!(result.item_tier(0), ItemTier::Verified);
        assert_eq!(result.item_tier(1), ItemTier::Unverified);
        assert_eq!(result.item_tier(2), ItemTier::StubPassthrough);
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let result = BuildResult {
            types_module: "types.py".into(),
            api_interface: "api.py".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            tools: BTreeMap::from([("book_reservation".into(), sample_result())]),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/build_manifest.json");
        let manifest = result.manifest();
        manifest.save(&path).unwrap();

        let loaded = BuildManifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);

        let tool = &loaded.tools["book_reservation"];
        assert_eq!(tool.guard_fn_name, "guard_book_reservation");
        assert_eq!(tool.item_guard_files[2], None);
        assert_eq!(tool.item_tier(0), ItemTier::Verified);
        assert_eq!(tool.item_tier(2), ItemTier::StubPassthrough);
    }

    #[test]
    fn null_entries_serialize_as_json_null() {
        let result = sample_result();
        let manifest = ToolManifest {
            guard_file: result.guard_artifact.file_name.clone(),
            guard_fn_name: result.guard_fn_name.clone(),
            item_names: vec!["a".into()],
            item_guard_files: vec![None],
            item_test_files: vec![None],
        };
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"item_guard_files\":[null]"));
    }
}
