//! # hookrunner - Cross-platform pre-commit enforcement engine
//!
//! Hooks are declared in `hooks.yaml` and scheduled as a dependency DAG:
//! independent hooks run in parallel batches, a failing batch stops the
//! run, and per-file results are cached by content hash so unchanged files
//! are skipped on re-runs. Remote and local policies are merged into one
//! effective rule set and evaluated against the changeset before any hook
//! spawns.
//!
//! ## Quick start
//!
//! ```bash
//! hookrunner init       # create hooks.yaml
//! hookrunner install    # install git hook shims
//! hookrunner run pre-commit
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod error;
pub mod executor;
pub mod git;
pub mod platform;
pub mod policy;
pub mod script;
pub mod tool;

pub use cli::Cli;
pub use config::Config;
pub use error::HookError;
pub use executor::{Executor, HookResult, Options};

/// Result type alias for hookrunner operations
pub type Result<T> = anyhow::Result<T>;
