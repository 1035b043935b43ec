//! Retry controller
//!
//! Drives one job through its attempt state machine:
//!
//! ```text
//! Pending -> Attempting -> Succeeded
//!                       -> Retrying -> Attempting ...
//!                       -> Exhausted
//!                       -> Misconfigured
//! ```
//!
//! Success stops immediately. Failures and timeouts are retried until the
//! policy's attempt budget is spent. Spawn failures are configuration
//! problems and are never retried.

use chrono::Utc;
use feedrun_core::domain::execution::{AttemptStatus, ExecutionAttempt, FinalStatus, JobOutcome};
use feedrun_core::domain::job::JobDescriptor;
use feedrun_core::domain::log::RunLogRecord;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::execution::ExecutionService;
use crate::repository::RunLog;

/// Lines of output kept on each attempt record
const ATTEMPT_TAIL_LINES: usize = 20;

/// Per-job state of the retry state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Attempting { attempt: u32 },
    Retrying { after_attempt: u32 },
    Succeeded,
    Exhausted,
    Misconfigured,
}

impl RunState {
    /// State that follows a finished attempt
    pub fn after_attempt(status: &AttemptStatus, attempt: u32, max_attempts: u32) -> Self {
        match status {
            AttemptStatus::Success => RunState::Succeeded,
            AttemptStatus::SpawnFailure { .. } => RunState::Misconfigured,
            AttemptStatus::Failure { .. } | AttemptStatus::Timeout { .. } => {
                if attempt < max_attempts {
                    RunState::Retrying {
                        after_attempt: attempt,
                    }
                } else {
                    RunState::Exhausted
                }
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Exhausted | RunState::Misconfigured
        )
    }
}

/// Wraps an execution service with the job's retry policy
#[derive(Clone)]
pub struct RetryController {
    executor: Arc<dyn ExecutionService>,
    run_log: Arc<RunLog>,
}

impl RetryController {
    pub fn new(executor: Arc<dyn ExecutionService>, run_log: Arc<RunLog>) -> Self {
        Self { executor, run_log }
    }

    /// Runs `job` until it succeeds or its policy gives up
    ///
    /// Every path resolves to an outcome. One `attempt` record per attempt
    /// is appended to the run log; only the last attempt's output is kept
    /// on the outcome.
    pub async fn run_with_retry(&self, job: &JobDescriptor, execution_id: Uuid) -> JobOutcome {
        let max_attempts = job.source.max_attempts();
        let started_at = Utc::now();
        let mut state = RunState::Pending;
        let mut attempt_number = 0;
        let mut last_attempt: Option<ExecutionAttempt> = None;

        while !state.is_terminal() {
            attempt_number += 1;
            state = self.transition(job, state, RunState::Attempting {
                attempt: attempt_number,
            });

            let attempt = self.executor.execute(job, attempt_number).await;
            self.record_attempt(job, execution_id, max_attempts, &attempt);

            let next = RunState::after_attempt(&attempt.status, attempt_number, max_attempts);
            last_attempt = Some(attempt);
            state = self.transition(job, state, next);

            if let RunState::Retrying { .. } = state {
                let delay = job.source.retry_delay();
                if !delay.is_zero() {
                    info!(
                        "Retrying job '{}' in {}s ({}/{} attempts used)",
                        job.id,
                        delay.as_secs(),
                        attempt_number,
                        max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        let final_status = last_attempt
            .as_ref()
            .map(|attempt| FinalStatus::from_attempt(&attempt.status))
            .unwrap_or(FinalStatus::Misconfigured);

        JobOutcome {
            job_id: job.id.clone(),
            execution_id,
            final_status,
            attempts_used: attempt_number,
            started_at,
            completed_at: Utc::now(),
            last_attempt,
        }
    }

    fn transition(&self, job: &JobDescriptor, from: RunState, to: RunState) -> RunState {
        debug!("Job '{}': {:?} -> {:?}", job.id, from, to);
        match to {
            RunState::Exhausted => warn!("Job '{}' exhausted its retry budget", job.id),
            RunState::Misconfigured => warn!("Job '{}' could not be started, not retrying", job.id),
            _ => {}
        }
        to
    }

    fn record_attempt(
        &self,
        job: &JobDescriptor,
        execution_id: Uuid,
        max_attempts: u32,
        attempt: &ExecutionAttempt,
    ) {
        let diagnostics = if attempt.stderr.is_empty() {
            &attempt.stdout
        } else {
            &attempt.stderr
        };

        let record = RunLogRecord::Attempt {
            timestamp: Utc::now(),
            job_id: job.id.clone(),
            execution_id,
            attempt: attempt.attempt_number,
            max_attempts,
            status: attempt.status.clone(),
            duration_ms: attempt.duration_ms(),
            output_tail: diagnostics.tail_lines(ATTEMPT_TAIL_LINES),
        };

        if let Err(e) = self.run_log.append(&record) {
            warn!("Failed to record attempt of job '{}': {}", job.id, e);
        }
    }
}
