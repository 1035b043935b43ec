//! Feedrun Runner
//!
//! Discovers declaratively configured jobs and executes them as isolated
//! external processes under a timeout and retry policy.
//!
//! Architecture:
//! - Configuration: job root, run log location, batch parallelism
//! - Repositories: the job catalog (scanned from disk) and the append-only run log
//! - Services: process execution, output capture and the retry controller
//! - Scheduler: the orchestrator behind the `list` and `run` entry points

pub mod config;
pub mod repository;
pub mod scheduler;
pub mod service;

pub use config::RunnerConfig;
pub use repository::{JobCatalog, RunLog};
pub use scheduler::{Orchestrator, RunError};

#[cfg(test)]
mod testing;
