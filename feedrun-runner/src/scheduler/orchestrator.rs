//! Orchestrator
//!
//! Entry points behind `run`. Each run gets an execution id
//! that ties its attempt, warning and summary records together.

use anyhow::Context;
use chrono::Utc;
use feedrun_core::domain::execution::{FinalStatus, JobOutcome};
use feedrun_core::domain::job::JobDescriptor;
use feedrun_core::domain::log::{RunLogRecord, WarningKind};
use feedrun_core::error::ValidationError;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::repository::{CatalogError, JobCatalog, RunLog};
use crate::service::{ExecutionService, RetryController, StandardExecutionService};

/// Reasons a requested job never reached the retry controller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("job '{0}' not found")]
    NotFound(String),

    #[error("job '{0}' is disabled, use --force to run it anyway")]
    Disabled(String),

    #[error("job '{id}' is misconfigured: {error}")]
    Misconfigured { id: String, error: ValidationError },
}

impl From<CatalogError> for RunError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => RunError::NotFound(id),
            CatalogError::Invalid { id, error } => RunError::Misconfigured { id, error },
        }
    }
}

/// Result of checking a job's declared output after it succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCheck {
    Present { path: PathBuf, bytes: u64 },
    /// Process exited 0 but no file was produced
    Missing { path: PathBuf },
    /// Job did not succeed, so nothing was checked
    Skipped,
}

/// Everything known about one job run
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_name: String,
    pub outcome: JobOutcome,
    pub output: OutputCheck,
}

/// Aggregated results of `run --all`
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per targeted job, ordered by id
    pub results: Vec<(String, Result<JobReport, RunError>)>,
    /// Job tasks that panicked and produced no result
    pub panicked: usize,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.panicked == 0
            && self
                .results
                .iter()
                .all(|(_, result)| matches!(result, Ok(report) if report.outcome.succeeded()))
    }
}

/// One unit of work of `run --all`
#[derive(Debug, Clone)]
pub enum BatchTarget {
    Job(JobDescriptor),
    /// Catalog entry that failed validation; reported, never started
    Misconfigured {
        id: String,
        name: Option<String>,
        error: ValidationError,
    },
}

impl BatchTarget {
    pub fn id(&self) -> &str {
        match self {
            BatchTarget::Job(job) => &job.id,
            BatchTarget::Misconfigured { id, .. } => id,
        }
    }
}

/// Coordinates catalog, retry controller and run log
pub struct Orchestrator {
    catalog: JobCatalog,
    controller: RetryController,
    run_log: Arc<RunLog>,
    max_parallel_jobs: usize,
}

impl Orchestrator {
    pub fn new(
        catalog: JobCatalog,
        executor: Arc<dyn ExecutionService>,
        run_log: Arc<RunLog>,
    ) -> Self {
        Self {
            catalog,
            controller: RetryController::new(executor, Arc::clone(&run_log)),
            run_log,
            max_parallel_jobs: 1,
        }
    }

    pub fn with_max_parallel_jobs(mut self, max_parallel_jobs: usize) -> Self {
        self.max_parallel_jobs = max_parallel_jobs.max(1);
        self
    }

    /// Scans the job root, opens the run log and wires the standard executor
    pub fn from_config(config: &RunnerConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let catalog = JobCatalog::discover(&config.jobs_dir)?;
        let run_log = RunLog::open(&config.log_file)
            .with_context(|| format!("Failed to open run log {}", config.log_file.display()))?;
        let executor = Arc::new(StandardExecutionService::new(config.capture_limit_bytes));

        Ok(Self::new(catalog, executor, Arc::new(run_log))
            .with_max_parallel_jobs(config.max_parallel_jobs))
    }

    /// Runs one job by id
    ///
    /// Disabled jobs only run with `force`. Once the job reaches the retry
    /// controller the result is always `Ok`, whatever the final status.
    pub async fn run(&self, job_id: &str, force: bool) -> Result<JobReport, RunError> {
        let job = match self.catalog.lookup(job_id) {
            Ok(job) => job,
            Err(CatalogError::Invalid { id, error }) => {
                let name = self
                    .catalog
                    .invalid()
                    .iter()
                    .find(|job| job.key() == id)
                    .and_then(|job| job.name.clone());
                return Err(self.misconfigured(id, name, error));
            }
            Err(e) => {
                error!("{}", e);
                return Err(e.into());
            }
        };

        if !job.enabled {
            if !force {
                warn!("Job '{}' is disabled. Use --force to run anyway.", job.id);
                return Err(RunError::Disabled(job.id.clone()));
            }
            info!("Job '{}' is disabled, running because of --force", job.id);
        }

        Ok(self.run_job(job).await)
    }

    /// Drives a resolved job through the retry controller and records it
    async fn run_job(&self, job: &JobDescriptor) -> JobReport {
        let execution_id = Uuid::new_v4();
        info!("Starting job: {} (execution {})", job.id, execution_id);

        let outcome = self.controller.run_with_retry(job, execution_id).await;

        let output = if outcome.succeeded() {
            self.check_output(job, &outcome)
        } else {
            OutputCheck::Skipped
        };

        self.record_summary(job, &outcome, &output);

        if outcome.succeeded() {
            info!(
                "Job '{}' completed successfully in {}s",
                job.id,
                outcome.total_duration_ms() / 1000
            );
        } else {
            error!(
                "Job '{}' finished with status {} after {} attempt(s)",
                job.id, outcome.final_status, outcome.attempts_used
            );
        }

        JobReport {
            job_name: job.name.clone(),
            outcome,
            output,
        }
    }

    async fn run_target(&self, target: &BatchTarget) -> Result<JobReport, RunError> {
        match target {
            BatchTarget::Job(job) => Ok(self.run_job(job).await),
            BatchTarget::Misconfigured { id, name, error } => {
                Err(self.misconfigured(id.clone(), name.clone(), error.clone()))
            }
        }
    }

    /// Work of `run --all`, one target per id, ordered by id
    ///
    /// Enabled jobs, plus invalid entries not explicitly disabled so that
    /// their misconfiguration shows up in the batch result. Directories
    /// sharing a duplicated id collapse into one target. A broken directory
    /// that declared no id is skipped when its name is a valid job's id.
    pub fn batch_targets(&self) -> Vec<BatchTarget> {
        let valid_ids: HashSet<&str> = self.catalog.jobs().map(|job| job.id.as_str()).collect();

        let mut targets: Vec<BatchTarget> = self
            .catalog
            .jobs()
            .filter(|job| job.enabled)
            .cloned()
            .map(BatchTarget::Job)
            .collect();

        let mut seen = HashSet::new();
        for invalid in self.catalog.invalid() {
            if invalid.enabled == Some(false) {
                continue;
            }
            let id = invalid.key();
            if valid_ids.contains(id.as_str()) {
                warn!(
                    "Skipping {} in batch: it declares no id and its name matches job '{}'",
                    invalid.dir.display(),
                    id
                );
                continue;
            }
            if !seen.insert(id.clone()) {
                continue;
            }
            targets.push(BatchTarget::Misconfigured {
                id,
                name: invalid.name.clone(),
                error: invalid.error.clone(),
            });
        }

        targets.sort_by(|a, b| a.id().cmp(b.id()));
        targets
    }

    /// Runs every batch target
    ///
    /// Jobs are isolated from each other: one job's failure never stops
    /// another. With `max_parallel_jobs > 1` up to that many run at once.
    pub async fn run_all(self: &Arc<Self>) -> BatchReport {
        let targets = self.batch_targets();
        info!(
            "Running {} job(s), up to {} at a time",
            targets.len(),
            self.max_parallel_jobs
        );

        let mut report = BatchReport::default();

        if self.max_parallel_jobs <= 1 {
            for target in targets {
                let result = self.run_target(&target).await;
                report.results.push((target.id().to_string(), result));
            }
            return report;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_parallel_jobs));
        let mut tasks = JoinSet::new();

        for target in targets {
            let orchestrator = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // Permit is released when dropped
                let _permit = semaphore.acquire_owned().await;
                let result = orchestrator.run_target(&target).await;
                (target.id().to_string(), result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    warn!("Job task panicked: {}", e);
                    report.panicked += 1;
                }
            }
        }

        report.results.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }

    /// Records a job that failed validation as a zero-attempt summary
    fn misconfigured(&self, id: String, name: Option<String>, error: ValidationError) -> RunError {
        error!("Job '{}' is misconfigured: {}", id, error);

        let now = Utc::now();
        let record = RunLogRecord::Summary {
            timestamp: now,
            job_id: id.clone(),
            job_name: name.unwrap_or_else(|| id.clone()),
            execution_id: Uuid::new_v4(),
            final_status: FinalStatus::Misconfigured,
            attempts_used: 0,
            started_at: now,
            completed_at: now,
            duration_seconds: 0,
            output_file: None,
            output_bytes: None,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error.to_string()),
        };
        if let Err(e) = self.run_log.append(&record) {
            warn!("Failed to record summary for job '{}': {}", id, e);
        }

        RunError::Misconfigured { id, error }
    }

    /// Notes in the run log that the listed jobs were cut short
    pub fn record_interrupted(&self, job_ids: Vec<String>) {
        let record = RunLogRecord::Interrupted {
            timestamp: Utc::now(),
            job_ids,
        };
        if let Err(e) = self.run_log.append(&record) {
            warn!("Failed to record interruption: {}", e);
        }
    }

    /// Checks for the declared output file, warning when it is missing
    ///
    /// The recorded status is never changed here.
    fn check_output(&self, job: &JobDescriptor, outcome: &JobOutcome) -> OutputCheck {
        let path = job.output_path();

        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                info!("Output file {} ({} bytes)", path.display(), meta.len());
                OutputCheck::Present {
                    path,
                    bytes: meta.len(),
                }
            }
            _ => {
                let message = format!(
                    "job exited 0 but declared output {} does not exist",
                    path.display()
                );
                warn!("Job '{}' {}: {}", job.id, WarningKind::SucceededButNoOutput, message);

                let record = RunLogRecord::Warning {
                    timestamp: Utc::now(),
                    job_id: job.id.clone(),
                    execution_id: outcome.execution_id,
                    kind: WarningKind::SucceededButNoOutput,
                    message,
                };
                if let Err(e) = self.run_log.append(&record) {
                    warn!("Failed to record warning for job '{}': {}", job.id, e);
                }

                OutputCheck::Missing { path }
            }
        }
    }

    fn record_summary(&self, job: &JobDescriptor, outcome: &JobOutcome, output: &OutputCheck) {
        let (output_file, output_bytes) = match output {
            OutputCheck::Present { path, bytes } => (Some(path.clone()), Some(*bytes)),
            OutputCheck::Missing { path } => (Some(path.clone()), None),
            OutputCheck::Skipped => (None, None),
        };
        let (stdout, stderr) = outcome
            .last_attempt
            .as_ref()
            .map(|attempt| (attempt.stdout.text.clone(), attempt.stderr.text.clone()))
            .unwrap_or_default();
        let error = outcome
            .last_attempt
            .as_ref()
            .filter(|attempt| !attempt.status.is_success())
            .map(|attempt| attempt.status.to_string());

        let record = RunLogRecord::Summary {
            timestamp: Utc::now(),
            job_id: job.id.clone(),
            job_name: job.name.clone(),
            execution_id: outcome.execution_id,
            final_status: outcome.final_status,
            attempts_used: outcome.attempts_used,
            started_at: outcome.started_at,
            completed_at: outcome.completed_at,
            duration_seconds: outcome.total_duration_ms() / 1000,
            output_file,
            output_bytes,
            stdout,
            stderr,
            error,
        };

        if let Err(e) = self.run_log.append(&record) {
            warn!("Failed to record summary for job '{}': {}", job.id, e);
        }
    }
}
