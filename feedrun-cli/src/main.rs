//! Feedrun CLI
//!
//! Command-line entry point for listing and running scraper jobs.

mod commands;
mod config;
mod exit;

use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "feedrun")]
#[command(about = "Content feeds job runner", long_about = None)]
struct Cli {
    /// Directory whose subdirectories hold job_config.json files
    #[arg(long, env = "FEEDRUN_JOBS_DIR", default_value = "jobs", global = true)]
    jobs_dir: PathBuf,

    /// Append-only run log
    #[arg(
        long,
        env = "FEEDRUN_LOG_FILE",
        default_value = "feedrun.log",
        global = true
    )]
    log_file: PathBuf,

    /// Default for `run --all --parallel`
    #[arg(
        long,
        env = "FEEDRUN_MAX_PARALLEL_JOBS",
        default_value_t = 1,
        global = true,
        hide = true
    )]
    max_parallel_jobs: usize,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedrun=info,feedrun_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config {
        jobs_dir: cli.jobs_dir,
        log_file: cli.log_file,
        max_parallel_jobs: cli.max_parallel_jobs,
    };

    match handle_command(cli.command, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("Command failed: {:#}", e);
            ExitCode::from(exit::FATAL)
        }
    }
}
