//! Append-only run log
//!
//! One JSON document per line. The log is a single-owner writer handed to
//! the orchestrator and the retry controller; appends are serialized by a
//! mutex and each line goes out in one `write_all` on an `O_APPEND` file,
//! so concurrent jobs never interleave partial lines.

use feedrun_core::domain::log::RunLogRecord;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunLogError {
    #[error("cannot open run log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write run log: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to encode run log record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Handle to the persistent run log
pub struct RunLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RunLog {
    /// Opens (creating if needed) the log file for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RunLogError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |source| RunLogError::Open {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_error)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_error)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Appends one record as a single line
    pub fn append(&self, record: &RunLogRecord) -> Result<(), RunLogError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        // A panic elsewhere while holding the lock leaves the file intact
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    /// Reads every record back, skipping lines that do not parse
    pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<RunLogRecord>, RunLogError> {
        let file = File::open(path.as_ref()).map_err(|source| RunLogError::Open {
            path: path.as_ref().to_path_buf(),
            source,
        })?;

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Ok(record) = serde_json::from_str(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use uuid::Uuid;

    fn interrupted(job: &str) -> RunLogRecord {
        RunLogRecord::Interrupted {
            timestamp: Utc::now(),
            job_ids: vec![job.to_string()],
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("feedrun.log");

        let log = RunLog::open(&path).unwrap();
        log.append(&interrupted("a")).unwrap();
        log.append(&interrupted("b")).unwrap();

        let records = RunLog::read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(
            &records[1],
            RunLogRecord::Interrupted { job_ids, .. } if job_ids == &["b".to_string()]
        ));
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedrun.log");

        RunLog::open(&path).unwrap().append(&interrupted("a")).unwrap();
        RunLog::open(&path).unwrap().append(&interrupted("b")).unwrap();

        assert_eq!(RunLog::read_records(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_appends_stay_line_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedrun.log");
        let log = Arc::new(RunLog::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let record = RunLogRecord::Warning {
                            timestamp: Utc::now(),
                            job_id: format!("job-{}", worker),
                            execution_id: Uuid::new_v4(),
                            kind: feedrun_core::domain::log::WarningKind::SucceededButNoOutput,
                            message: "x".repeat(i * 40),
                        };
                        log.append(&record).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 400);
        for line in lines {
            assert!(serde_json::from_str::<RunLogRecord>(line).is_ok());
        }
    }
}
