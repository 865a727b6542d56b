//! Generator fallback — ordered retry chain with per-backend timeouts.
//!
//! When a backend fails (timeout, rate limit, error), automatically
//! tries the next backend in the configured chain. The repair loops see
//! a single `CodeGenerator`; degraded backends are invisible to them.

use async_trait::async_trait;
use guardsmith_core::codegen::{CodeGenerator, PromptContext};
use guardsmith_core::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A generator that wraps an ordered list of backends and falls back on
/// failure.
pub struct FallbackGenerator {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    generator: Arc<dyn CodeGenerator>,
    timeout: Duration,
}

impl FallbackGenerator {
    /// Create a new fallback generator with no entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a backend to the chain with a custom timeout.
    pub fn add(mut self, generator: Arc<dyn CodeGenerator>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { generator, timeout });
        self
    }

    /// Add a backend with the default timeout (300s).
    pub fn add_default(self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.add(generator, Duration::from_secs(300))
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl CodeGenerator for FallbackGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, ctx: &PromptContext) -> Result<String, ProviderError> {
        let mut last_error = ProviderError::NotConfigured("No backends in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let backend = entry.generator.name().to_string();

            info!(
                backend = %backend,
                attempt = i + 1,
                total = self.chain.len(),
                "Fallback: trying backend"
            );

            match tokio::time::timeout(entry.timeout, entry.generator.generate(ctx)).await {
                Ok(Ok(completion)) => return Ok(completion),
                Ok(Err(e)) => {
                    warn!(backend = %backend, error = %e, "Fallback: backend failed, trying next");
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        backend = %backend,
                        timeout_secs = entry.timeout.as_secs(),
                        "Fallback: backend timed out, trying next"
                    );
                    last_error = ProviderError::Timeout(format!(
                        "Backend '{}' timed out after {}s",
                        backend,
                        entry.timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }
}
