//! Error types for the Guardsmith domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Guardsmith operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Toolchain errors ---
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    // --- Generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Filesystem ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Completion contained no usable source text: {0}")]
    MalformedCompletion(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("Failed to spawn {tool}: {reason}")]
    Spawn { tool: String, reason: String },

    #[error("{tool} timed out after {timeout_secs}s")]
    Timeout { tool: String, timeout_secs: u64 },

    #[error("Failed to parse {tool} output: {reason}")]
    ReportParse { tool: String, reason: String },

    #[error("Environment provisioning failed: {0}")]
    EnvProvision(String),
}

/// Errors raised by the generate/validate/repair state machines.
///
/// `MissingToolMethod` is a build-time configuration defect and is never
/// retried. The two `*Exhausted` variants mark a bounded repair loop that
/// hit its trial ceiling; the orchestrator catches them per policy item
/// and degrades instead of failing the whole tool.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("No abstract method named '{tool}' in the domain API surface")]
    MissingToolMethod { tool: String },

    #[error("Generated tests for {tool}/{item} still contain errors after {trials} trials")]
    TestSynthesisExhausted {
        tool: String,
        item: String,
        trials: u32,
    },

    #[error("Failed to generate guard function for {tool}/{item} after {trials} improvement trials")]
    GuardSynthesisExhausted {
        tool: String,
        item: String,
        trials: u32,
    },
}
