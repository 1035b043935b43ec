//! Run command handler
//!
//! Runs one job or the whole batch and maps the outcome to an exit code.
//! Ctrl-C drops the in-flight runs, which kills their process groups.

use anyhow::Result;
use clap::Args;
use colored::*;
use feedrun_core::domain::execution::{AttemptStatus, FinalStatus};
use feedrun_runner::scheduler::{BatchReport, JobReport, OutputCheck};
use feedrun_runner::{Orchestrator, RunError};
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::exit;

/// Lines of stderr shown for a failed job
const STDERR_TAIL_LINES: usize = 10;

#[derive(Args)]
pub struct RunArgs {
    /// Job id to run
    #[arg(long, required_unless_present = "all", conflicts_with = "all")]
    pub job: Option<String>,

    /// Run every enabled job
    #[arg(long)]
    pub all: bool,

    /// Run the job even if it is disabled
    #[arg(long, conflicts_with = "all")]
    pub force: bool,

    /// Maximum number of jobs running at once with --all
    #[arg(long, requires = "all")]
    pub parallel: Option<usize>,
}

pub async fn handle_run_command(args: RunArgs, config: &Config) -> Result<u8> {
    let parallel = args.parallel.unwrap_or(config.max_parallel_jobs);
    let orchestrator = Orchestrator::from_config(&config.runner_config(parallel))?;

    match args.job {
        Some(job_id) => run_single(orchestrator, &job_id, args.force).await,
        None => run_batch(Arc::new(orchestrator)).await,
    }
}

async fn run_single(orchestrator: Orchestrator, job_id: &str, force: bool) -> Result<u8> {
    let result = tokio::select! {
        result = orchestrator.run(job_id, force) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping job '{}'", job_id);
            orchestrator.record_interrupted(vec![job_id.to_string()]);
            println!("{}", format!("✗ {} interrupted", job_id).red());
            return Ok(exit::INTERRUPTED);
        }
    };

    print_result(job_id, &result);
    Ok(exit::for_result(&result))
}

async fn run_batch(orchestrator: Arc<Orchestrator>) -> Result<u8> {
    let targets: Vec<String> = orchestrator
        .batch_targets()
        .iter()
        .map(|target| target.id().to_string())
        .collect();
    if targets.is_empty() {
        println!("{}", "No enabled jobs to run.".yellow());
        return Ok(exit::SUCCESS);
    }

    let report = tokio::select! {
        report = orchestrator.run_all() => report,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping {} job(s)", targets.len());
            orchestrator.record_interrupted(targets);
            println!("{}", "✗ Batch interrupted".red());
            return Ok(exit::INTERRUPTED);
        }
    };

    for (job_id, result) in &report.results {
        print_result(job_id, result);
    }
    print_batch_summary(&report);

    let code = exit::combine(report.results.iter().map(|(_, result)| exit::for_result(result)));
    if report.panicked > 0 {
        return Ok(exit::combine([code, exit::FAILED]));
    }
    Ok(code)
}

fn print_result(job_id: &str, result: &Result<JobReport, RunError>) {
    match result {
        Ok(report) => print_report(job_id, report),
        Err(e) => println!("{} {}", "✗".red(), e.to_string().red()),
    }
}

fn print_report(job_id: &str, report: &JobReport) {
    let outcome = &report.outcome;
    let seconds = outcome.total_duration_ms() as f64 / 1000.0;

    let headline = format!(
        "{} ({}): {} after {} attempt(s) in {:.1}s",
        job_id, report.job_name, outcome.final_status, outcome.attempts_used, seconds
    );
    match outcome.final_status {
        FinalStatus::Succeeded => println!("{} {}", "✓".green(), headline.green()),
        _ => println!("{} {}", "✗".red(), headline.red()),
    }

    match &report.output {
        OutputCheck::Present { path, bytes } => {
            println!("    Output: {} ({} bytes)", path.display(), bytes);
        }
        OutputCheck::Missing { path } => {
            println!(
                "    {}",
                format!("⚠ Exited 0 but {} was not written", path.display()).yellow()
            );
        }
        OutputCheck::Skipped => {}
    }

    if outcome.succeeded() {
        return;
    }

    let Some(attempt) = &outcome.last_attempt else {
        return;
    };
    println!("    Last attempt: {}", attempt.status);
    if let AttemptStatus::SpawnFailure { .. } = attempt.status {
        return;
    }
    let tail = attempt.stderr.tail_lines(STDERR_TAIL_LINES);
    if !tail.is_empty() {
        println!("    {}", "stderr:".dimmed());
        for line in tail.lines() {
            println!("      {}", line.dimmed());
        }
    }
}

fn print_batch_summary(report: &BatchReport) {
    let succeeded = report
        .results
        .iter()
        .filter(|(_, result)| matches!(result, Ok(r) if r.outcome.succeeded()))
        .count();
    let total = report.results.len() + report.panicked;

    println!("{}", "─".repeat(80).dimmed());
    let summary = format!("{}/{} job(s) succeeded", succeeded, total);
    if report.all_succeeded() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
}
