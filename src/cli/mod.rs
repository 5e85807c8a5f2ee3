//! Command-line interface
//!
//! Clap-based command tree. Each subcommand lives in its own module under
//! `commands/` and returns a process exit code; `main` applies it after
//! all cleanup has run.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod commands;
mod output;

pub use output::{render_policy, render_results, Output, Reporter};

/// Cross-platform pre-commit hook system
#[derive(Parser)]
#[command(name = "hookrunner", version, about)]
#[command(long_about = "A cross-platform pre-commit hook system with YAML/JSON configuration,\n\
                        DAG-scheduled parallel execution, and remote policy enforcement")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install git hooks for the configured hook-types
    Install,
    /// Remove installed git hooks
    Uninstall,
    /// Run the hooks of one hook-type
    Run(commands::run::RunArgs),
    /// List configured hooks and tools
    List,
    /// Validate the configuration file
    Validate,
    /// Create a default hooks.yaml
    Init,
    /// Manage policies
    #[command(subcommand)]
    Policy(PolicyCommands),
    /// Manage the per-file hook cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// List configured policies
    List,
    /// Force refresh remote policies
    Fetch,
    /// Clear the policy cache
    ClearCache,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Clear the hook result cache
    Clear,
}

impl Cli {
    /// Execute the selected command, returning the process exit code.
    pub async fn run(self) -> Result<i32> {
        match self.command {
            Commands::Install => commands::install::install(),
            Commands::Uninstall => commands::install::uninstall(),
            Commands::Run(args) => commands::run::execute(args).await,
            Commands::List => commands::list::execute(),
            Commands::Validate => commands::validate::execute().await,
            Commands::Init => commands::init::execute(),
            Commands::Policy(cmd) => commands::policy::execute(cmd).await,
            Commands::Cache(cmd) => commands::cache::execute(cmd),
        }
    }
}
