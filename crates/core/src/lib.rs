//! # Guardsmith Core
//!
//! Domain types, collaborator traits, and error definitions for the
//! Guardsmith guard-generation pipeline. This crate has **zero
//! framework dependencies** — it defines the data model and the seams
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM backend, static checker, test
//! runner) is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping backends via configuration
//! - Easy testing with scripted mock collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod artifact;
pub mod codegen;
pub mod domain;
pub mod error;
pub mod policy;
pub mod result;
pub mod toolchain;

// Re-export key types at crate root for ergonomics
pub use artifact::SourceArtifact;
pub use codegen::{CodeGenerator, PromptContext, extract_source};
pub use domain::{Domain, MethodSpec, ParamSpec};
pub use error::{Error, GenerationError, ProviderError, Result, ToolchainError};
pub use policy::{PolicyItem, ToolPolicy};
pub use result::{BuildManifest, BuildResult, GenerationResult, ItemTier, ToolGuardResult, ToolManifest};
pub use toolchain::{
    CheckDiagnostic, CheckReport, RunMode, Severity, StaticChecker, TestReport, TestRunner,
};
