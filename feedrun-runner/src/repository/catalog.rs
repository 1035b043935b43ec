//! Job catalog
//!
//! Scans the immediate subdirectories of the job root. A subdirectory is a
//! job when it contains `job_config.json`; others are skipped. A job whose
//! configuration fails validation is kept as an [`InvalidJob`] so one broken
//! directory never hides its siblings.

use feedrun_core::domain::job::{JobDescriptor, OutputConfig, SourceConfig, is_file};
use feedrun_core::dto::job_config::{CONFIG_FILE_NAME, JobConfigFile};
use feedrun_core::error::ValidationError;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// The job root itself could not be scanned
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot read job root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lookup failures for a single job id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("job '{0}' not found")]
    NotFound(String),

    #[error("job '{id}' is misconfigured: {error}")]
    Invalid { id: String, error: ValidationError },
}

/// A job directory whose configuration failed validation
///
/// Whatever could be read from the file is kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidJob {
    pub dir: PathBuf,
    pub declared_id: Option<String>,
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub error: ValidationError,
}

impl InvalidJob {
    /// Declared id, or the directory name when the id could not be read
    pub fn key(&self) -> String {
        self.declared_id.clone().unwrap_or_else(|| {
            self.dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        })
    }
}

/// One row of the catalog listing
#[derive(Debug, Clone, Copy)]
pub enum CatalogEntry<'a> {
    Valid(&'a JobDescriptor),
    Invalid(&'a InvalidJob),
}

impl CatalogEntry<'_> {
    pub fn key(&self) -> String {
        match self {
            CatalogEntry::Valid(job) => job.id.clone(),
            CatalogEntry::Invalid(job) => job.key(),
        }
    }
}

/// Validated in-memory catalog of all jobs found under one root
#[derive(Debug, Clone, Default)]
pub struct JobCatalog {
    root: PathBuf,
    jobs: BTreeMap<String, JobDescriptor>,
    invalid: Vec<InvalidJob>,
}

impl JobCatalog {
    /// Scans `root` and builds the catalog
    ///
    /// Only an unreadable root is an error; every per-job problem is
    /// recorded on the catalog instead.
    pub fn discover(root: &Path) -> Result<Self, DiscoveryError> {
        let unreadable = |source| DiscoveryError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        };

        let root = std::fs::canonicalize(root).map_err(unreadable)?;
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&root).map_err(unreadable)? {
            match entry {
                Ok(entry) if entry.path().is_dir() => dirs.push(entry.path()),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry in {}: {}", root.display(), e),
            }
        }
        dirs.sort();

        let mut loaded = Vec::new();
        let mut invalid = Vec::new();
        for dir in dirs {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if !config_path.is_file() {
                debug!("Skipping {} (no {})", dir.display(), CONFIG_FILE_NAME);
                continue;
            }

            match load_job(&dir, &config_path) {
                Ok(job) => {
                    debug!("Loaded config for job: {}", job.id);
                    loaded.push(job);
                }
                Err(job) => {
                    warn!("Invalid job in {}: {}", dir.display(), job.error);
                    invalid.push(job);
                }
            }
        }

        let jobs = reject_duplicates(loaded, &mut invalid);
        invalid.sort_by_key(|job| (job.key(), job.dir.clone()));

        info!(
            "Loaded {} job configuration(s), {} invalid",
            jobs.len(),
            invalid.len()
        );

        Ok(Self {
            root,
            jobs,
            invalid,
        })
    }

    /// Canonical path of the scanned root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Finds a runnable job by id
    pub fn lookup(&self, id: &str) -> Result<&JobDescriptor, CatalogError> {
        if let Some(job) = self.jobs.get(id) {
            return Ok(job);
        }

        match self.invalid.iter().find(|job| job.key() == id) {
            Some(job) => Err(CatalogError::Invalid {
                id: id.to_string(),
                error: job.error.clone(),
            }),
            None => Err(CatalogError::NotFound(id.to_string())),
        }
    }

    /// Every entry, valid or not, ordered by id
    pub fn list(&self) -> Vec<CatalogEntry<'_>> {
        let mut entries: Vec<CatalogEntry<'_>> = self
            .jobs
            .values()
            .map(CatalogEntry::Valid)
            .chain(self.invalid.iter().map(CatalogEntry::Invalid))
            .collect();
        entries.sort_by_key(|entry| entry.key());
        entries
    }

    /// Valid jobs, ordered by id
    pub fn jobs(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.jobs.values()
    }

    pub fn invalid(&self) -> &[InvalidJob] {
        &self.invalid
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.invalid.is_empty()
    }
}

/// Reads, parses and validates one job directory
fn load_job(dir: &Path, config_path: &Path) -> Result<JobDescriptor, InvalidJob> {
    let invalid = |error, raw: Option<&serde_json::Value>| InvalidJob {
        dir: dir.to_path_buf(),
        declared_id: raw
            .and_then(|v| v.get("job_id"))
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        name: raw
            .and_then(|v| v.get("name"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        enabled: raw.and_then(|v| v.get("enabled")).and_then(|v| v.as_bool()),
        error,
    };

    let content = std::fs::read_to_string(config_path).map_err(|e| {
        invalid(
            ValidationError::Unreadable {
                path: config_path.to_path_buf(),
                message: e.to_string(),
            },
            None,
        )
    })?;

    // Loose parse first so a rejected file can still be listed by id and name
    let raw: Option<serde_json::Value> = serde_json::from_str(&content).ok();

    let config: JobConfigFile = serde_json::from_str(&content)
        .map_err(|e| invalid(ValidationError::Parse(e.to_string()), raw.as_ref()))?;

    validate(dir, config).map_err(|e| invalid(e, raw.as_ref()))
}

/// Turns a parsed document into a descriptor, resolving paths against `dir`
fn validate(dir: &Path, config: JobConfigFile) -> Result<JobDescriptor, ValidationError> {
    if config.job_id.trim().is_empty() {
        return Err(ValidationError::EmptyField("job_id"));
    }
    if config.source.kind != "script" {
        return Err(ValidationError::UnsupportedSourceType(config.source.kind));
    }
    if config.source.timeout_seconds == 0 {
        return Err(ValidationError::InvalidTimeout);
    }
    if config.output.filename.trim().is_empty() {
        return Err(ValidationError::EmptyField("output.filename"));
    }
    if let Some(interpreter) = &config.source.interpreter {
        if interpreter.trim().is_empty() {
            return Err(ValidationError::EmptyField("source.interpreter"));
        }
    }

    let working_directory = dir.join(&config.source.working_directory);
    let working_directory = std::fs::canonicalize(&working_directory)
        .ok()
        .filter(|p| p.is_dir())
        .ok_or(ValidationError::MissingWorkingDirectory(working_directory))?;

    let entry_point = working_directory.join(&config.source.script_path);
    if !is_file(&entry_point) {
        return Err(ValidationError::MissingEntryPoint(entry_point));
    }

    Ok(JobDescriptor {
        id: config.job_id,
        name: config.name,
        description: config.description,
        enabled: config.enabled,
        job_dir: dir.to_path_buf(),
        source: SourceConfig {
            entry_point,
            interpreter: config.source.interpreter,
            args: config.source.args,
            working_directory,
            timeout_seconds: config.source.timeout_seconds,
            retry_attempts: config.source.retry_attempts,
            retry_delay_seconds: config.source.retry_delay_seconds,
        },
        output: OutputConfig {
            format: config.output.format,
            directory: config.output.directory,
            filename: config.output.filename,
        },
    })
}

/// Moves every job sharing an id with another directory to `invalid`
///
/// An ambiguous id is never runnable; all of its directories are reported.
fn reject_duplicates(
    loaded: Vec<JobDescriptor>,
    invalid: &mut Vec<InvalidJob>,
) -> BTreeMap<String, JobDescriptor> {
    let mut dirs_by_id: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for job in &loaded {
        dirs_by_id
            .entry(job.id.clone())
            .or_default()
            .push(job.job_dir.clone());
    }
    // Invalid directories that still declared an id take part as well
    for job in invalid.iter() {
        if let Some(id) = &job.declared_id {
            if let Some(dirs) = dirs_by_id.get_mut(id) {
                dirs.push(job.dir.clone());
            }
        }
    }

    let mut jobs = BTreeMap::new();
    for job in loaded {
        let dirs = &dirs_by_id[&job.id];
        if dirs.len() == 1 {
            jobs.insert(job.id.clone(), job);
            continue;
        }

        let other = dirs
            .iter()
            .find(|d| **d != job.job_dir)
            .cloned()
            .unwrap_or_default();
        warn!(
            "Duplicate job id '{}' in {} and {}",
            job.id,
            job.job_dir.display(),
            other.display()
        );
        invalid.push(InvalidJob {
            dir: job.job_dir.clone(),
            declared_id: Some(job.id.clone()),
            name: Some(job.name),
            enabled: Some(job.enabled),
            error: ValidationError::DuplicateId { id: job.id, other },
        });
    }
    jobs
}
