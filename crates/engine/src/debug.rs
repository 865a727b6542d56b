//! Per-trial audit snapshots.
//!
//! Every trial's generated content and diagnostic report is persisted
//! under a deterministic `(tool, policy item, trial)` path, regardless
//! of whether the trial becomes the accepted version. Concurrent
//! writers never collide because no two trials share a path. Audit
//! writes never fail the build; a lost snapshot is logged and ignored.

use chrono::Utc;
use guardsmith_core::artifact::SourceArtifact;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Which repair loop produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialKind {
    Tests,
    /// Guard regeneration within outer improvement trial `n`.
    Guard(u32),
    /// The one-shot unverified fallback generation.
    UnverifiedGuard,
}

impl TrialKind {
    fn dir_name(self) -> String {
        match self {
            TrialKind::Tests => "tests".into(),
            TrialKind::Guard(improvement) => format!("guard_improve_{improvement}"),
            TrialKind::UnverifiedGuard => "guard_unverified".into(),
        }
    }
}

/// Append-mostly audit store rooted at the run's debug directory.
#[derive(Debug, Clone)]
pub struct DebugStore {
    root: PathBuf,
}

impl DebugStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The snapshot directory for one trial.
    pub fn trial_dir(&self, tool: &str, item: &str, kind: TrialKind, trial: u32) -> PathBuf {
        self.root
            .join(tool)
            .join(item)
            .join(kind.dir_name())
            .join(format!("trial_{trial}"))
    }

    /// Persist one trial's artifact and diagnostics.
    pub fn record(
        &self,
        tool: &str,
        item: &str,
        kind: TrialKind,
        trial: u32,
        artifact: &SourceArtifact,
        diagnostics: &[String],
    ) {
        let dir = self.trial_dir(tool, item, kind, trial);
        if let Err(e) = self.write_snapshot(&dir, artifact, diagnostics) {
            warn!(tool, item, trial, error = %e, "Failed to persist audit snapshot");
        }
    }

    fn write_snapshot(
        &self,
        dir: &Path,
        artifact: &SourceArtifact,
        diagnostics: &[String],
    ) -> guardsmith_core::Result<()> {
        artifact.save(dir)?;
        let report = serde_json::json!({
            "recorded_at": Utc::now(),
            "file_name": artifact.file_name,
            "diagnostics": diagnostics,
        });
        std::fs::write(
            dir.join("diagnostics.json"),
            serde_json::to_string_pretty(&report)?,
        )?;
        Ok(())
    }
}
