//! Configuration loading, validation, and management for Guardsmith.
//!
//! Loads configuration from `guardsmith.toml` with environment variable
//! overrides. Validates all settings at startup, before the build
//! orchestrator fans out any work.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `guardsmith.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the code-generation backend (env override:
    /// `GUARDSMITH_API_KEY`, then `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Code-generation provider: "anthropic" or "openai".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model used for all generation calls.
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional fallback model tried when the primary provider fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,

    /// Sampling temperature for generation calls.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Repair-loop trial ceilings.
    #[serde(default)]
    pub budgets: BudgetConfig,

    /// External toolchain settings (python, venv, timeouts).
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Output directory layout.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    8192
}

/// Trial ceilings for the bounded repair loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Trials for test synthesis (generate + revise).
    #[serde(default = "default_test_gen_trials")]
    pub test_gen_trials: u32,

    /// Outer green-loop improvement trials per guard.
    #[serde(default = "default_tool_improvements")]
    pub tool_improvements: u32,

    /// Inner syntax-repair trials per regeneration.
    #[serde(default = "default_syntax_repair_trials")]
    pub syntax_repair_trials: u32,
}

fn default_test_gen_trials() -> u32 {
    3
}
fn default_tool_improvements() -> u32 {
    5
}
fn default_syntax_repair_trials() -> u32 {
    3
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            test_gen_trials: default_test_gen_trials(),
            tool_improvements: default_tool_improvements(),
            syntax_repair_trials: default_syntax_repair_trials(),
        }
    }
}

/// External toolchain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Python interpreter used to create the virtualenv.
    #[serde(default = "default_python")]
    pub python: String,

    /// Name of the virtualenv provisioned for checks and test runs.
    #[serde(default = "default_venv_name")]
    pub venv_name: String,

    /// Packages installed into the virtualenv before any generation
    /// work begins.
    #[serde(default = "default_requirements")]
    pub requirements: Vec<String>,

    /// Per-invocation timeout for checker/runner calls, in seconds.
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_python() -> String {
    "python3".into()
}
fn default_venv_name() -> String {
    "guardsmith-env".into()
}
fn default_requirements() -> Vec<String> {
    vec!["mypy".into(), "pytest".into(), "pydantic".into()]
}
fn default_tool_timeout_secs() -> u64 {
    120
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            venv_name: default_venv_name(),
            requirements: default_requirements(),
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

/// Output directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root for generated guards, tests, and the build manifest.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Subdirectory (under `dir`) for per-trial audit snapshots.
    #[serde(default = "default_debug_subdir")]
    pub debug_subdir: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("guardsmith-out")
}
fn default_debug_subdir() -> String {
    "debug".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            debug_subdir: default_debug_subdir(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("budgets", &self.budgets)
            .field("toolchain", &self.toolchain)
            .field("output", &self.output)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from `guardsmith.toml` in the working
    /// directory (or defaults), then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(Path::new("guardsmith.toml"))?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("GUARDSMITH_API_KEY")
                .ok()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("GUARDSMITH_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("GUARDSMITH_MODEL") {
            config.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.budgets.test_gen_trials == 0
            || self.budgets.tool_improvements == 0
            || self.budgets.syntax_repair_trials == 0
        {
            return Err(ConfigError::ValidationError(
                "trial budgets must be at least 1".into(),
            ));
        }

        match self.provider.as_str() {
            "anthropic" | "openai" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "unknown provider '{other}' (expected 'anthropic' or 'openai')"
            ))),
        }
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Path of the per-trial audit directory.
    pub fn debug_dir(&self) -> PathBuf {
        self.output.dir.join(&self.output.debug_subdir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            model: default_model(),
            fallback_model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            budgets: BudgetConfig::default(),
            toolchain: ToolchainConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.budgets.test_gen_trials, 3);
        assert_eq!(config.budgets.tool_improvements, 5);
        assert_eq!(config.budgets.syntax_repair_trials, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.toolchain.venv_name, config.toolchain.venv_name);
    }

    #[test]
    fn loads_partial_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guardsmith.toml");
        std::fs::write(
            &path,
            r#"
model = "claude-opus-4-20250514"

[budgets]
tool_improvements = 7
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "claude-opus-4-20250514");
        assert_eq!(config.budgets.tool_improvements, 7);
        // Untouched sections keep defaults.
        assert_eq!(config.budgets.test_gen_trials, 3);
        assert_eq!(config.toolchain.python, "python3");
    }

    #[test]
    fn rejects_zero_trial_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guardsmith.toml");
        std::fs::write(&path, "[budgets]\ntest_gen_trials = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_unknown_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guardsmith.toml");
        std::fs::write(&path, "provider = \"bard\"\n").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
