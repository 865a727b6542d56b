//! Virtualenv provisioning.
//!
//! The build environment is the one genuinely shared resource of a run:
//! it is provisioned exactly once, before any concurrent generation
//! work begins, and treated as read-only thereafter. Checkers and
//! runners receive a handle and resolve tool binaries through it.

use guardsmith_core::error::ToolchainError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// A provisioned Python virtual environment.
#[derive(Debug, Clone)]
pub struct VirtualEnv {
    root: PathBuf,
}

impl VirtualEnv {
    /// Create (or reuse) the virtualenv at `root` and install the
    /// required packages. Reuse is keyed on the interpreter existing;
    /// package installation is re-run either way so upgraded
    /// requirement lists take effect.
    pub async fn provision(
        python: &str,
        root: &Path,
        requirements: &[String],
    ) -> Result<Self, ToolchainError> {
        let env = Self {
            root: root.to_path_buf(),
        };

        if !env.interpreter().exists() {
            info!(root = %root.display(), "Creating virtualenv");
            let output = Command::new(python)
                .args(["-m", "venv"])
                .arg(root)
                .output()
                .await
                .map_err(|e| ToolchainError::Spawn {
                    tool: python.to_string(),
                    reason: e.to_string(),
                })?;

            if !output.status.success() {
                return Err(ToolchainError::EnvProvision(format!(
                    "venv creation failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
        } else {
            debug!(root = %root.display(), "Reusing existing virtualenv");
        }

        if !requirements.is_empty() {
            let output = Command::new(env.interpreter())
                .args(["-m", "pip", "install", "--quiet"])
                .args(requirements)
                .output()
                .await
                .map_err(|e| ToolchainError::Spawn {
                    tool: "pip".into(),
                    reason: e.to_string(),
                })?;

            if !output.status.success() {
                return Err(ToolchainError::EnvProvision(format!(
                    "pip install failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
        }

        info!(root = %root.display(), "Virtualenv ready");
        Ok(env)
    }

    /// Handle to an environment assumed to already exist (no
    /// provisioning, used by tests and `inspect`-style read paths).
    pub fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The environment's Python interpreter.
    pub fn interpreter(&self) -> PathBuf {
        self.bin_dir().join(if cfg!(target_os = "windows") {
            "python.exe"
        } else {
            "python"
        })
    }

    fn bin_dir(&self) -> PathBuf {
        self.root.join(if cfg!(target_os = "windows") {
            "Scripts"
        } else {
            "bin"
        })
    }
}
