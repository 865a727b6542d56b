//! The guard-generation pipeline: scaffolding, dependency analysis,
//! test synthesis, the guard green loop, and the build orchestrator
//! that fans them out across tools and policy items.

pub mod debug;
pub mod deps;
pub mod guardgen;
pub mod orchestrator;
pub mod prompts;
pub mod scaffold;
pub mod testgen;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use debug::DebugStore;
pub use deps::DependencyAnalyzer;
pub use guardgen::GuardSynthesizer;
pub use orchestrator::BuildOrchestrator;
pub use scaffold::Scaffolder;
pub use testgen::TestSynthesizer;
