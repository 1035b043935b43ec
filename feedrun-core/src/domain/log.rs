//! Run log records
//!
//! Every line of the persistent run log is one [`RunLogRecord`] serialized
//! as JSON. Records of one job run share an `execution_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::execution::{AttemptStatus, FinalStatus};

/// Warning kinds that do not change a job's recorded status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// Process exited 0 but the declared output file is missing
    SucceededButNoOutput,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningKind::SucceededButNoOutput => write!(f, "succeeded-but-no-output"),
        }
    }
}

/// One line of the append-only run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum RunLogRecord {
    Attempt {
        timestamp: DateTime<Utc>,
        job_id: String,
        execution_id: Uuid,
        attempt: u32,
        max_attempts: u32,
        status: AttemptStatus,
        duration_ms: i64,
        /// Short tail of stderr (or stdout when stderr is empty)
        output_tail: String,
    },
    Summary {
        timestamp: DateTime<Utc>,
        job_id: String,
        job_name: String,
        execution_id: Uuid,
        final_status: FinalStatus,
        attempts_used: u32,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        duration_seconds: i64,
        output_file: Option<PathBuf>,
        output_bytes: Option<u64>,
        /// Full captured stdout of the last attempt
        stdout: String,
        /// Full captured stderr of the last attempt
        stderr: String,
        /// Why the job did not succeed, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Warning {
        timestamp: DateTime<Utc>,
        job_id: String,
        execution_id: Uuid,
        kind: WarningKind,
        message: String,
    },
    Interrupted {
        timestamp: DateTime<Utc>,
        job_ids: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_record_serialization() {
        let record = RunLogRecord::Warning {
            timestamp: Utc::now(),
            job_id: "gitleaks".to_string(),
            execution_id: Uuid::new_v4(),
            kind: WarningKind::SucceededButNoOutput,
            message: "missing".to_string(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["record"], "warning");
        assert_eq!(json["kind"], "succeeded-but-no-output");

        let back: RunLogRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
