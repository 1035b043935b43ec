//! Execution domain types
//!
//! An [`ExecutionAttempt`] is one run of a job's external process. A
//! [`JobOutcome`] is what remains after the retry policy is done with a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of a single attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Process exited with code 0 within its timeout
    Success,
    /// Process exited non-zero, or was killed by a signal it did not expect
    Failure {
        exit_code: Option<i32>,
        signal: Option<i32>,
    },
    /// Process outlived its wall-clock budget and was killed
    Timeout { timeout_seconds: u64 },
    /// Process could not be started at all
    SpawnFailure { error: String },
}

impl AttemptStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptStatus::Success)
    }

    /// Failures and timeouts may be retried; spawn failures never are
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttemptStatus::Failure { .. } | AttemptStatus::Timeout { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttemptStatus::Success => "success",
            AttemptStatus::Failure { .. } => "failure",
            AttemptStatus::Timeout { .. } => "timeout",
            AttemptStatus::SpawnFailure { .. } => "spawn_failure",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptStatus::Success => write!(f, "success"),
            AttemptStatus::Failure {
                exit_code: Some(code),
                ..
            } => write!(f, "failure (exit code {})", code),
            AttemptStatus::Failure {
                signal: Some(signal),
                ..
            } => write!(f, "failure (killed by signal {})", signal),
            AttemptStatus::Failure { .. } => write!(f, "failure"),
            AttemptStatus::Timeout { timeout_seconds } => {
                write!(f, "timeout after {}s", timeout_seconds)
            }
            AttemptStatus::SpawnFailure { error } => write!(f, "spawn failure: {}", error),
        }
    }
}

/// Bounded capture of one output stream
///
/// Only the tail of the stream is kept once it grows past the capture
/// limit; `total_bytes` records how much the process actually wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub text: String,
    pub total_bytes: u64,
    pub truncated: bool,
}

impl CapturedOutput {
    pub fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }

    /// Last `max_lines` lines of the captured text
    pub fn tail_lines(&self, max_lines: usize) -> String {
        let lines: Vec<&str> = self.text.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

/// One execution of a job's external process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionAttempt {
    /// 1-based attempt counter
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: AttemptStatus,
    pub stdout: CapturedOutput,
    pub stderr: CapturedOutput,
}

impl ExecutionAttempt {
    /// Attempt that never got a process, e.g. because spawning failed
    pub fn spawn_failure(attempt_number: u32, started_at: DateTime<Utc>, error: String) -> Self {
        Self {
            attempt_number,
            started_at,
            ended_at: Utc::now(),
            status: AttemptStatus::SpawnFailure { error },
            stdout: CapturedOutput::default(),
            stderr: CapturedOutput::default(),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0)
    }
}

/// Final status of a job after the retry policy is exhausted or satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Succeeded,
    Failed,
    TimedOut,
    Misconfigured,
}

impl FinalStatus {
    /// Final status implied by the last attempt of an exhausted run
    pub fn from_attempt(status: &AttemptStatus) -> Self {
        match status {
            AttemptStatus::Success => FinalStatus::Succeeded,
            AttemptStatus::Failure { .. } => FinalStatus::Failed,
            AttemptStatus::Timeout { .. } => FinalStatus::TimedOut,
            AttemptStatus::SpawnFailure { .. } => FinalStatus::Misconfigured,
        }
    }
}

impl std::fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinalStatus::Succeeded => write!(f, "succeeded"),
            FinalStatus::Failed => write!(f, "failed"),
            FinalStatus::TimedOut => write!(f, "timed_out"),
            FinalStatus::Misconfigured => write!(f, "misconfigured"),
        }
    }
}

/// Result of a full run of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub execution_id: Uuid,
    pub final_status: FinalStatus,
    pub attempts_used: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Last attempt, kept for its diagnostic output
    pub last_attempt: Option<ExecutionAttempt>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.final_status == FinalStatus::Succeeded
    }

    pub fn total_duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at)
            .num_milliseconds()
            .max(0)
    }
}
