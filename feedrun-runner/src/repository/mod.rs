//! Repository layer
//!
//! Repositories own the engine's two pieces of on-disk state: the job
//! catalog, rebuilt by scanning the job root on every invocation, and the
//! append-only run log.

mod catalog;
mod run_log;

pub use catalog::{CatalogEntry, CatalogError, DiscoveryError, InvalidJob, JobCatalog};
pub use run_log::{RunLog, RunLogError};
