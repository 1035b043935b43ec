//! `job_config.json` document
//!
//! Unknown fields are ignored. Missing required fields and wrongly typed
//! values are reported by serde and become a validation error for that job.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::job::{DEFAULT_TIMEOUT_SECONDS, OutputFormat};

/// File name that marks a directory as a job
pub const CONFIG_FILE_NAME: &str = "job_config.json";

/// Top-level job configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfigFile {
    pub job_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub source: SourceSection,
    pub output: OutputSection,
}

/// `source` section: how the job is launched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Only `"script"` is supported
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(alias = "entry_point")]
    pub script_path: PathBuf,
    #[serde(default = "default_working_directory")]
    pub working_directory: PathBuf,
    #[serde(default, alias = "python_env")]
    pub interpreter: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub retry_attempts: u32,
    #[serde(default)]
    pub retry_delay_seconds: u64,
}

/// `output` section: where results are expected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub format: OutputFormat,
    pub directory: PathBuf,
    pub filename: String,
}

fn default_enabled() -> bool {
    true
}

fn default_working_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}
