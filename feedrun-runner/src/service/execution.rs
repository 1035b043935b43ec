//! Execution service
//!
//! Runs exactly one attempt of a job: builds the job's command line,
//! spawns it in the job's working directory under the job's timeout and
//! classifies the result. Retry decisions live in the retry controller.

use async_trait::async_trait;
use chrono::Utc;
use feedrun_core::domain::execution::ExecutionAttempt;
use feedrun_core::domain::job::{JobDescriptor, is_file};
use tracing::{info, warn};

use super::runnable::{Runnable, ScriptCommand};

/// Service trait for executing a single job attempt
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Executes one attempt of `job`
    ///
    /// # Arguments
    /// * `job` - The validated job descriptor
    /// * `attempt_number` - 1-based attempt counter, recorded on the result
    async fn execute(&self, job: &JobDescriptor, attempt_number: u32) -> ExecutionAttempt;
}

/// Standard implementation running the job's script as a child process
pub struct StandardExecutionService {
    capture_limit: usize,
}

impl StandardExecutionService {
    /// Creates a new execution service
    ///
    /// # Arguments
    /// * `capture_limit` - Bytes of stdout/stderr kept per attempt
    pub fn new(capture_limit: usize) -> Self {
        Self { capture_limit }
    }
}

#[async_trait]
impl ExecutionService for StandardExecutionService {
    async fn execute(&self, job: &JobDescriptor, attempt_number: u32) -> ExecutionAttempt {
        info!(
            "Starting attempt {}/{} of job '{}'",
            attempt_number,
            job.source.max_attempts(),
            job.id
        );

        // An interpreter would start fine and then fail on the missing file
        if !is_file(&job.source.entry_point) {
            let error = format!(
                "entry point {} does not exist",
                job.source.entry_point.display()
            );
            warn!("Job '{}': {}", job.id, error);
            return ExecutionAttempt::spawn_failure(attempt_number, Utc::now(), error);
        }

        let command = ScriptCommand::for_job(job, self.capture_limit);
        let attempt = command
            .spawn(
                attempt_number,
                &job.source.working_directory,
                job.source.timeout(),
            )
            .await;

        info!(
            "Attempt {} of job '{}' finished: {} ({} ms)",
            attempt_number,
            job.id,
            attempt.status,
            attempt.duration_ms()
        );

        attempt
    }
}
