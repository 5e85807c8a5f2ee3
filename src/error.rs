//! Error taxonomy for the hook engine.
//!
//! Configuration, DAG, and validation errors are fatal and abort the run
//! before any hook executes. Tool and execution errors fail the specific
//! hook only; policy fetch errors may fall back to a stale disk cache.

use std::time::Duration;

/// Errors produced by the core engine.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Unreadable or unparseable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Cycle in the hook `after` graph.
    #[error("circular dependency detected in hook graph")]
    DagCycle,

    /// Duplicate names, dangling `after` references, bad regexes.
    #[error("validation error: {0}")]
    Validation(String),

    /// Tool is neither on PATH nor declared in the tools table.
    #[error("tool {0} not found in PATH")]
    ToolNotFound(String),

    /// Non-200 response or transport failure while installing a tool.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// Downloaded bytes do not hash to the declared checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Install URL does not end in a supported archive suffix.
    #[error("unsupported archive format: {0}")]
    ArchiveUnsupported(String),

    /// Policy URL is not https.
    #[error("HTTPS required: {0}")]
    InsecureUrl(String),

    /// Policy body parsed as neither YAML nor JSON.
    #[error("invalid policy format")]
    InvalidPolicyFormat,

    /// Network or protocol failure while fetching a policy.
    #[error("policy fetch failed for {url}: {reason}")]
    PolicyFetch { url: String, reason: String },

    /// Hook subprocess exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Hook subprocess exited non-zero.
    #[error("hook failed: {0}")]
    HookFailed(String),

    /// Hook declares zero or multiple invocation modes.
    #[error("hook must set exactly one of tool, run, or script")]
    InvalidHookShape,

    /// Filesystem failure outside the swallowed cache paths.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
