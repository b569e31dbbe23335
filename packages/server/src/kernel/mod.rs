//! Kernel module - server infrastructure and dependencies.

pub mod deps;

pub use deps::{build_server_deps, llm_tracing};
