//! LLM code-generation backends for Guardsmith.
//!
//! All backends implement the `guardsmith_core::CodeGenerator` trait.
//! [`from_config`] wires the configured backend (plus an optional
//! fallback model) into a single generator handle the engine consumes.

use guardsmith_config::{AppConfig, ConfigError};
use guardsmith_core::codegen::CodeGenerator;
use std::sync::Arc;
use std::time::Duration;

pub mod anthropic;
pub mod fallback;
pub mod openai_compat;

pub use anthropic::AnthropicGenerator;
pub use fallback::FallbackGenerator;
pub use openai_compat::OpenAiCompatGenerator;

/// Build the code-generation collaborator described by the config.
///
/// With `fallback_model` set, the primary model is wrapped in a
/// [`FallbackGenerator`] that retries on the secondary before
/// surfacing a provider error.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn CodeGenerator>, ConfigError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ConfigError::ValidationError(
            "no API key configured (set GUARDSMITH_API_KEY or guardsmith.toml api_key)".into(),
        )
    })?;

    let build = |model: &str| -> Arc<dyn CodeGenerator> {
        match config.provider.as_str() {
            "openai" => Arc::new(
                OpenAiCompatGenerator::new(&api_key, model)
                    .with_temperature(config.temperature)
                    .with_max_tokens(config.max_tokens),
            ),
            _ => Arc::new(
                AnthropicGenerator::new(&api_key, model)
                    .with_temperature(config.temperature)
                    .with_max_tokens(config.max_tokens),
            ),
        }
    };

    let primary = build(&config.model);

    match &config.fallback_model {
        None => Ok(primary),
        Some(fallback_model) => {
            let chain = FallbackGenerator::new("codegen")
                .add(primary, Duration::from_secs(300))
                .add(build(fallback_model), Duration::from_secs(300));
            Ok(Arc::new(chain))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_api_key() {
        let config = AppConfig::default();
        assert!(from_config(&config).is_err());
    }

    #[test]
    fn from_config_builds_primary_generator() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".into());
        let generator = from_config(&config).unwrap();
        assert_eq!(generator.name(), "anthropic");
    }

    #[test]
    fn from_config_wraps_fallback_chain() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".into());
        config.fallback_model = Some("claude-3-5-haiku-20241022".into());
        let generator = from_config(&config).unwrap();
        assert_eq!(generator.name(), "codegen");
    }
}
