//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod list;
mod run;

pub use run::RunArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List every job found in the jobs directory
    List,
    /// Run one job, or every enabled job with --all
    Run(RunArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Returns
/// The process exit code, or an error for fatal setup failures
pub async fn handle_command(command: Commands, config: &Config) -> Result<u8> {
    match command {
        Commands::List => list::handle_list_command(config),
        Commands::Run(args) => run::handle_run_command(args, config).await,
    }
}
