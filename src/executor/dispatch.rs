//! Per-hook dispatch
//!
//! One hook goes through a fixed pipeline: skip gating, file filtering,
//! the content-cache probe, command assembly, then a timed subprocess with
//! combined output capture. Everything here is local to a single hook; the
//! scheduler in the parent module owns ordering and fan-out.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::cache::identity_hash;
use crate::config::{Hook, Invocation};
use crate::error::HookError;

use super::{Advisory, Executor, HookResult};

/// Default subprocess deadline when the hook declares none.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// A gating env var is truthy when set to anything but "", "0", or "false".
fn truthy(value: Option<String>) -> bool {
    matches!(value.as_deref(), Some(v) if !v.is_empty() && v != "0" && v != "false")
}

impl Executor {
    /// Run one hook against the changeset and report its result. Never
    /// panics and never returns early without a result; every failure mode
    /// maps to a failed `HookResult`.
    pub(super) async fn run_hook(
        &self,
        hook: &Hook,
        files: &[String],
        all_files: bool,
        advisory: &Advisory,
    ) -> HookResult {
        let start = Instant::now();

        if let Some(reason) = self.should_skip(hook, advisory) {
            return HookResult::skipped(&hook.name, &reason, start.elapsed());
        }

        let filtered = if all_files {
            files.to_vec()
        } else {
            let filtered = filter_files(files, hook);
            if filtered.is_empty() {
                return HookResult::skipped(&hook.name, "no matching files", start.elapsed());
            }
            filtered
        };

        // Content-cache probe: the hook runs only when some file's current
        // bytes have not already passed this hook identity.
        let mut cached_run: Option<(String, Vec<String>)> = None;
        if self.opts.use_cache {
            let identity = identity_hash(hook);
            let (_, uncached) =
                self.cache
                    .partition(&hook.name, &filtered, &identity, &self.work_dir);
            if uncached.is_empty() {
                return HookResult::skipped(&hook.name, "cached", start.elapsed());
            }
            cached_run = Some((identity, uncached));
        }

        let result = match self.execute(hook, advisory).await {
            Ok(output) => HookResult {
                name: hook.name.clone(),
                success: true,
                skipped: false,
                duration: start.elapsed(),
                output,
                error: None,
            },
            Err((error, output)) => HookResult {
                name: hook.name.clone(),
                success: false,
                skipped: false,
                duration: start.elapsed(),
                output,
                error: Some(error.to_string()),
            },
        };

        if result.success {
            if let Some((identity, uncached)) = cached_run {
                self.cache
                    .mark_passed(&hook.name, &uncached, &identity, &self.work_dir);
            }
        }

        result
    }

    /// Skip gating, in order: the global `SKIP` list, the hook's `skip`
    /// env var, its `only` env var, and the config's tag excludes. Hooks
    /// the effective policy enforces are never skipped by gating.
    fn should_skip(&self, hook: &Hook, advisory: &Advisory) -> Option<String> {
        if advisory.enforce_hooks.iter().any(|h| h == &hook.name) {
            return None;
        }

        if self.opts.skip_hooks.iter().any(|s| s == &hook.name) {
            return Some("SKIP env".into());
        }

        if let Some(var) = hook.skip.as_deref().filter(|v| !v.is_empty()) {
            if truthy(std::env::var(var).ok()) {
                return Some("skip condition".into());
            }
        }

        if let Some(var) = hook.only.as_deref().filter(|v| !v.is_empty()) {
            if !truthy(std::env::var(var).ok()) {
                return Some("only condition".into());
            }
        }

        if hook
            .tags
            .iter()
            .any(|tag| self.config.exclude_tags.contains(tag))
        {
            return Some("excluded tag".into());
        }

        None
    }

    /// Assemble and spawn the hook's process, capturing combined output.
    /// Returns the captured output on success, or the error plus whatever
    /// output was captured before the failure.
    async fn execute(&self, hook: &Hook, advisory: &Advisory) -> Result<String, (HookError, String)> {
        let invocation = hook
            .invocation(self.opts.fix)
            .map_err(|e| (e, String::new()))?;

        let mut cmd = match invocation {
            Invocation::Run { command } => {
                let (shell, flag) = self.opts.platform.shell();
                let mut cmd = Command::new(shell);
                cmd.arg(flag).arg(command);
                cmd
            }
            Invocation::Script { path, runner } => {
                let scripts_dir = self.config.scripts_dir.as_deref().unwrap_or(".hooks");
                let script_path = self.work_dir.join(scripts_dir).join(&path);
                let runner = runner.unwrap_or_else(|| {
                    self.opts.platform.default_runner(&path).to_string()
                });
                let mut cmd = Command::new(runner);
                cmd.arg(script_path);
                cmd
            }
            Invocation::Tool { name, args } => {
                let tool_path = self
                    .tools
                    .ensure_tool(&name, self.config.tool(&name))
                    .await
                    .map_err(|e| (e, String::new()))?;
                let mut cmd = Command::new(tool_path);
                cmd.args(args);
                cmd
            }
        };

        let cwd = match hook.root.as_deref().filter(|r| !r.is_empty()) {
            Some(root) => self.work_dir.join(root),
            None => self.work_dir.clone(),
        };
        cmd.current_dir(cwd);

        // Children inherit the parent environment; the hook's own entries
        // are layered on top and pass_env names are forwarded explicitly.
        for (key, value) in &hook.env {
            cmd.env(key, value);
        }
        for name in &hook.pass_env {
            if let Ok(value) = std::env::var(name) {
                cmd.env(name, value);
            }
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = self.effective_timeout(hook, advisory);
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err((
                    HookError::HookFailed(format!("failed to spawn: {e}")),
                    String::new(),
                ))
            }
            Err(_elapsed) => return Err((HookError::Timeout(timeout), String::new())),
        };

        let combined = combine_output(&output.stdout, &output.stderr);

        if output.status.success() {
            Ok(combined)
        } else {
            let code = output
                .status
                .code()
                .map(|c| format!("exit code {c}"))
                .unwrap_or_else(|| "signal".to_string());
            Err((HookError::HookFailed(code), combined))
        }
    }

    fn effective_timeout(&self, hook: &Hook, advisory: &Advisory) -> Duration {
        let mut timeout = hook
            .timeout
            .as_deref()
            .and_then(|t| humantime::parse_duration(t).ok())
            .unwrap_or(DEFAULT_TIMEOUT);

        if let Some(budget_ms) = advisory.hook_time_budget_ms.get(&hook.name) {
            timeout = timeout.min(Duration::from_millis(*budget_ms));
        }

        timeout
    }

    /// Dry-run projection: walk the plan and describe what each hook would
    /// do without spawning anything.
    pub(super) fn project(
        &self,
        plan: &[Vec<&Hook>],
        files: &[String],
        all_files: bool,
        advisory: &Advisory,
    ) -> Vec<HookResult> {
        let mut results = Vec::new();

        for batch in plan {
            for &hook in batch {
                let start = Instant::now();

                if let Some(reason) = self.should_skip(hook, advisory) {
                    results.push(HookResult::skipped(&hook.name, &reason, start.elapsed()));
                    continue;
                }

                let filtered = if all_files {
                    files.to_vec()
                } else {
                    filter_files(files, hook)
                };
                if !all_files && filtered.is_empty() {
                    results.push(HookResult::skipped(
                        &hook.name,
                        "no matching files",
                        start.elapsed(),
                    ));
                    continue;
                }

                let what = match hook.invocation(self.opts.fix) {
                    Ok(Invocation::Run { command }) => format!("would run: {command}"),
                    Ok(Invocation::Script { path, .. }) => format!("would run script: {path}"),
                    Ok(Invocation::Tool { name, args }) => {
                        format!("would run: {name} {}", args.join(" "))
                    }
                    Err(e) => {
                        results.push(HookResult {
                            name: hook.name.clone(),
                            success: false,
                            skipped: false,
                            duration: start.elapsed(),
                            output: String::new(),
                            error: Some(e.to_string()),
                        });
                        continue;
                    }
                };

                let sample: Vec<&str> = filtered.iter().take(3).map(String::as_str).collect();
                let output = if sample.is_empty() {
                    what
                } else if filtered.len() > sample.len() {
                    format!("{what} [{} +{} more]", sample.join(", "), filtered.len() - sample.len())
                } else {
                    format!("{what} [{}]", sample.join(", "))
                };

                results.push(HookResult {
                    name: hook.name.clone(),
                    success: true,
                    skipped: false,
                    duration: start.elapsed(),
                    output,
                    error: None,
                });
            }
        }

        results
    }
}

/// Apply the hook's selectors: `files` regex must match, `glob` must match
/// the basename, `exclude` regex must not match. With neither `files` nor
/// `glob` set the filter is a no-op and every file passes.
fn filter_files(files: &[String], hook: &Hook) -> Vec<String> {
    let files_pattern = hook.files.as_deref().filter(|p| !p.is_empty());
    let glob_pattern = hook.glob.as_deref().filter(|p| !p.is_empty());

    if files_pattern.is_none() && glob_pattern.is_none() {
        return files.to_vec();
    }

    // An uncompilable selector matches nothing.
    let files_re = files_pattern.map(|p| regex::Regex::new(p).ok());
    let glob = glob_pattern.map(|p| globset::Glob::new(p).ok().map(|g| g.compile_matcher()));
    let exclude_re = hook
        .exclude
        .as_deref()
        .filter(|p| !p.is_empty())
        .and_then(|p| regex::Regex::new(p).ok());

    files
        .iter()
        .filter(|file| {
            match &files_re {
                Some(Some(re)) if re.is_match(file) => {}
                None => {}
                _ => return false,
            }

            match &glob {
                Some(Some(matcher)) => {
                    let base = std::path::Path::new(file.as_str())
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.to_string());
                    if !matcher.is_match(&base) {
                        return false;
                    }
                }
                Some(None) => return false,
                None => {}
            }

            if let Some(re) = &exclude_re {
                if re.is_match(file) {
                    return false;
                }
            }

            true
        })
        .cloned()
        .collect()
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut combined = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        combined.push_str(&String::from_utf8_lossy(stderr));
    }
    combined
}
