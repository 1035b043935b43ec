//! Runner configuration
//!
//! Defines the settings shared by every command: where jobs live, where
//! the run log goes, and how batch runs are executed.

use anyhow::bail;
use std::path::PathBuf;

/// Bytes kept per output stream of an attempt
pub const DEFAULT_CAPTURE_LIMIT: usize = 64 * 1024;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory whose immediate subdirectories are jobs
    pub jobs_dir: PathBuf,

    /// Append-only run log (JSON lines)
    pub log_file: PathBuf,

    /// Jobs run at once by `run --all`; 1 means sequential
    pub max_parallel_jobs: usize,

    /// Tail of stdout/stderr kept per attempt
    pub capture_limit_bytes: usize,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new(jobs_dir: impl Into<PathBuf>, log_file: impl Into<PathBuf>) -> Self {
        Self {
            jobs_dir: jobs_dir.into(),
            log_file: log_file.into(),
            max_parallel_jobs: 1,
            capture_limit_bytes: DEFAULT_CAPTURE_LIMIT,
        }
    }

    pub fn with_max_parallel_jobs(mut self, max_parallel_jobs: usize) -> Self {
        self.max_parallel_jobs = max_parallel_jobs;
        self
    }

    pub fn with_capture_limit(mut self, capture_limit_bytes: usize) -> Self {
        self.capture_limit_bytes = capture_limit_bytes;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jobs_dir.as_os_str().is_empty() {
            bail!("jobs_dir cannot be empty");
        }

        if self.log_file.as_os_str().is_empty() {
            bail!("log_file cannot be empty");
        }

        if self.max_parallel_jobs == 0 {
            bail!("max_parallel_jobs must be greater than 0");
        }

        if self.capture_limit_bytes == 0 {
            bail!("capture_limit_bytes must be greater than 0");
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new("jobs", "feedrun.log")
    }
}
