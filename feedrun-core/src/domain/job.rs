//! Job descriptor domain types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default wall-clock limit for a single attempt
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 3600;

/// A validated job, built once per engine invocation by scanning the job root
///
/// Descriptors are never mutated after discovery. All paths are resolved
/// against the job directory, so they can be used as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    /// Directory holding the job's `job_config.json`
    pub job_dir: PathBuf,
    pub source: SourceConfig,
    pub output: OutputConfig,
}

impl JobDescriptor {
    /// Absolute location where the job is expected to leave its results
    pub fn output_path(&self) -> PathBuf {
        self.source
            .working_directory
            .join(&self.output.directory)
            .join(&self.output.filename)
    }
}

/// How a job is launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Program or script to run, resolved against the working directory
    pub entry_point: PathBuf,
    /// Optional interpreter placed in front of the entry point (e.g. `python3`)
    pub interpreter: Option<String>,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    /// Total number of attempts the retry policy allows
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }

    /// Program and argument vector used to spawn the job
    pub fn command_line(&self) -> (String, Vec<String>) {
        let entry = self.entry_point.to_string_lossy().to_string();
        match &self.interpreter {
            Some(interpreter) => {
                let mut args = Vec::with_capacity(self.args.len() + 1);
                args.push(entry);
                args.extend(self.args.iter().cloned());
                (interpreter.clone(), args)
            }
            None => (entry, self.args.clone()),
        }
    }
}

/// Where a job declares its output will appear
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub directory: PathBuf,
    pub filename: String,
}

/// Declared format of a job's output file
///
/// The engine never reads the file; the format is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Returns true when `path` exists and is a regular file
pub fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(interpreter: Option<&str>) -> SourceConfig {
        SourceConfig {
            entry_point: PathBuf::from("/jobs/gitleaks/main.py"),
            interpreter: interpreter.map(str::to_string),
            args: vec!["--fast".to_string()],
            working_directory: PathBuf::from("/jobs/gitleaks"),
            timeout_seconds: 10,
            retry_attempts: 2,
            retry_delay_seconds: 1,
        }
    }

    #[test]
    fn test_command_line_with_interpreter() {
        let (program, args) = source(Some("python3")).command_line();
        assert_eq!(program, "python3");
        assert_eq!(args, vec!["/jobs/gitleaks/main.py", "--fast"]);
    }

    #[test]
    fn test_command_line_direct() {
        let (program, args) = source(None).command_line();
        assert_eq!(program, "/jobs/gitleaks/main.py");
        assert_eq!(args, vec!["--fast"]);
    }

    #[test]
    fn test_max_attempts() {
        let mut src = source(None);
        assert_eq!(src.max_attempts(), 3);
        src.retry_attempts = 0;
        assert_eq!(src.max_attempts(), 1);
        assert_eq!(src.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_output_path() {
        let job = JobDescriptor {
            id: "gitleaks".to_string(),
            name: "Gitleaks".to_string(),
            description: String::new(),
            enabled: true,
            job_dir: PathBuf::from("/jobs/gitleaks"),
            source: source(None),
            output: OutputConfig {
                format: OutputFormat::Json,
                directory: PathBuf::from("data"),
                filename: "rules.jsonl".to_string(),
            },
        };
        assert_eq!(
            job.output_path(),
            PathBuf::from("/jobs/gitleaks/data/rules.jsonl")
        );
    }
}
