//! External toolchain adapters for Guardsmith.
//!
//! Implements the `StaticChecker` and `TestRunner` collaborator traits
//! from `guardsmith-core` by shelling out to mypy and pytest inside a
//! virtualenv provisioned once per run.

pub mod pytest;
pub mod typecheck;
pub mod venv;

pub use pytest::PytestRunner;
pub use typecheck::MypyChecker;
pub use venv::VirtualEnv;
