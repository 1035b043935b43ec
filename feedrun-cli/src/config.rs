//! Configuration module
//!
//! Handles CLI configuration: global options resolved from flags or the
//! environment, turned into the runner's configuration per command.

use feedrun_runner::RunnerConfig;
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory scanned for jobs
    pub jobs_dir: PathBuf,
    /// Persistent run log
    pub log_file: PathBuf,
    /// Batch parallelism used when `run --all` has no `--parallel`
    pub max_parallel_jobs: usize,
}

impl Config {
    /// Runner configuration for a command running up to `max_parallel_jobs` at once
    pub fn runner_config(&self, max_parallel_jobs: usize) -> RunnerConfig {
        RunnerConfig::new(&self.jobs_dir, &self.log_file).with_max_parallel_jobs(max_parallel_jobs)
    }
}
