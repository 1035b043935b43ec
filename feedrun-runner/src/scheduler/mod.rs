//! Scheduler layer
//!
//! The orchestrator resolves job ids against the catalog, hands jobs to the
//! retry controller, checks their declared output and writes the per-job
//! summary to the run log.

pub mod orchestrator;

pub use orchestrator::{BatchReport, BatchTarget, JobReport, Orchestrator, OutputCheck, RunError};
