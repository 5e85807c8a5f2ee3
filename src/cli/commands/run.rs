//! The run command: policies first, then the hook DAG
//!
//! Sequencing for one hook-type: load config, resolve the file set from
//! git, evaluate policies against files and commit message, then drive the
//! scheduler. Any policy violation aborts before a single hook spawns.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::cli::{Output, Reporter};
use crate::config::Config;
use crate::executor::{has_failure, parse_skip_env, Executor, Options};
use crate::git;

#[derive(Args)]
pub struct RunArgs {
    /// Hook-type to run (pre-commit, pre-push, commit-msg)
    pub hook_type: String,

    /// Commit message file, forwarded by the commit-msg shim
    pub commit_msg_file: Option<PathBuf>,

    /// Run on all tracked files instead of staged files
    #[arg(long)]
    pub all_files: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output
    #[arg(short, long)]
    pub quiet: bool,

    /// Run hooks in fix mode (fix_args replace args)
    #[arg(long)]
    pub fix: bool,

    /// Continue past failing batches
    #[arg(long)]
    pub no_fail_fast: bool,

    /// Show what would run without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Run hooks in an isolated checkout of staged content
    #[arg(long)]
    pub clean_room: bool,

    /// Skip hooks for files that already passed unchanged
    #[arg(long = "cached")]
    pub use_cache: bool,
}

pub async fn execute(args: RunArgs) -> Result<i32> {
    let output = Output::new(args.verbose, args.quiet);
    let work_dir = std::env::current_dir()?;

    if args.no_color {
        console::set_colors_enabled(false);
    }

    let (config, _) = Config::load(&work_dir)?;
    if config.hooks(&args.hook_type).is_empty() {
        anyhow::bail!("no hooks configured for {}", args.hook_type);
    }

    let files = if args.all_files {
        git::all_files()?
    } else {
        git::staged_files()?
    };
    if files.is_empty() && !args.all_files {
        output.info("No staged files");
        return Ok(0);
    }

    let commit_msg = match &args.commit_msg_file {
        Some(path) if args.hook_type == "commit-msg" => read_commit_msg(path)?,
        _ => String::new(),
    };

    let clean_room = if args.clean_room {
        let dir = git::create_clean_room().context("failed to create clean-room")?;
        output.info(&format!("Running hooks in: {}", dir.display()));
        Some(dir)
    } else {
        None
    };
    let execution_dir = clean_room.clone().unwrap_or_else(|| work_dir.clone());

    if args.use_cache {
        ensure_gitignore_entry(&work_dir, &output);
    }

    let mut executor = Executor::new(config, &work_dir, execution_dir);
    executor.set_options(Options {
        verbose: args.verbose,
        quiet: args.quiet,
        fix: args.fix,
        fail_fast: !args.no_fail_fast,
        dry_run: args.dry_run,
        use_cache: args.use_cache,
        skip_hooks: parse_skip_env(),
        ..Default::default()
    });

    let exit_code = drive(&executor, &args, &files, &commit_msg, &output).await;

    if let Some(dir) = clean_room {
        if let Err(e) = git::cleanup_clean_room(&dir) {
            output.warning(&format!("failed to clean up temp directory: {e}"));
        }
    }

    Ok(exit_code)
}

async fn drive(
    executor: &Executor,
    args: &RunArgs,
    files: &[String],
    commit_msg: &str,
    output: &Output,
) -> i32 {
    let policy_result = executor.check_policies(files, commit_msg).await;
    if let Some(result) = &policy_result {
        if !result.passed {
            output.policy(result);
            return 1;
        }
    }

    let results = executor.run(&args.hook_type, files, args.all_files).await;
    output.results(&results);

    if let Some(result) = &policy_result {
        output.policy(result);
    }

    if has_failure(&results) {
        1
    } else {
        0
    }
}

/// Read the commit message file, dropping comment lines the way git does.
fn read_commit_msg(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read commit message file: {}", path.display()))?;
    Ok(raw
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string())
}

/// Keep the cache directory out of version control.
fn ensure_gitignore_entry(work_dir: &Path, output: &Output) {
    let path = work_dir.join(".gitignore");
    let current = std::fs::read_to_string(&path).unwrap_or_default();
    if current.contains(".hookrunner") {
        return;
    }

    let mut updated = current;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(".hookrunner/\n");

    if std::fs::write(&path, updated).is_ok() {
        output.info("Added '.hookrunner/' to .gitignore");
    }
}
