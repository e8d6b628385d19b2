//! Hostgraph Exec - process launch, live output streaming, and the
//! one-active-execution-per-node registry

pub mod engine;
pub mod process;
pub mod registry;

pub use engine::ExecEngine;
pub use process::ProcessHandle;
pub use registry::{ExecRegistry, RunningExec};
