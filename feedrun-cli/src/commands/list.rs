//! List command handler
//!
//! Prints the catalog. Never executes anything; per-job validation errors
//! are shown but do not fail the command.

use anyhow::{Context, Result};
use colored::*;
use feedrun_core::domain::job::JobDescriptor;
use feedrun_runner::JobCatalog;
use feedrun_runner::repository::{CatalogEntry, InvalidJob};

use crate::config::Config;
use crate::exit;

pub fn handle_list_command(config: &Config) -> Result<u8> {
    let catalog = JobCatalog::discover(&config.jobs_dir)
        .with_context(|| format!("Failed to scan {}", config.jobs_dir.display()))?;

    let entries = catalog.list();
    if entries.is_empty() {
        println!(
            "{}",
            format!("No jobs found in {}.", catalog.root().display()).yellow()
        );
        return Ok(exit::SUCCESS);
    }

    println!(
        "{}",
        format!(
            "Found {} job(s) in {}:",
            entries.len(),
            catalog.root().display()
        )
        .bold()
    );
    println!("{}", "─".repeat(80).dimmed());
    for entry in entries {
        match entry {
            CatalogEntry::Valid(job) => print_job(job),
            CatalogEntry::Invalid(job) => print_invalid_job(job),
        }
    }

    Ok(exit::SUCCESS)
}

fn print_job(job: &JobDescriptor) {
    let state = if job.enabled {
        "✓ enabled".green()
    } else {
        "⏸ disabled".yellow()
    };

    println!("  {} {}  {}", "▸".cyan(), job.id.bold(), state);
    println!("    Name:     {}", job.name);
    if !job.description.is_empty() {
        println!("    About:    {}", job.description.dimmed());
    }
    println!(
        "    Output:   {} ({})",
        job.output_path().display(),
        job.output.format
    );
    println!(
        "    Policy:   timeout {}s, {} retr{} every {}s",
        job.source.timeout_seconds,
        job.source.retry_attempts,
        if job.source.retry_attempts == 1 { "y" } else { "ies" },
        job.source.retry_delay_seconds
    );
    println!();
}

fn print_invalid_job(job: &InvalidJob) {
    println!("  {} {}  {}", "▸".cyan(), job.key().bold(), "✗ invalid".red());
    if let Some(name) = &job.name {
        println!("    Name:     {}", name);
    }
    if job.enabled == Some(false) {
        println!("    State:    {}", "disabled".yellow());
    }
    println!("    Dir:      {}", job.dir.display().to_string().dimmed());
    println!("    Error:    {}", job.error.to_string().red());
    println!();
}
