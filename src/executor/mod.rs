//! Hook scheduling and execution
//!
//! The scheduler turns one hook-type's hooks into a DAG, flattens it into
//! level-sets, and drives each level as a concurrent batch: every hook in a
//! batch runs at once, the batch joins before the next one starts, and a
//! failure stops the walk at the batch boundary when fail-fast is on.
//! Failures never cancel running siblings; their results are still
//! collected and reported in (batch, configuration) order.

mod dispatch;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::cache::ContentCache;
use crate::config::Config;
use crate::dag::Graph;
use crate::platform::Platform;
use crate::policy::evaluator::{evaluate, EvalResult, Violation};
use crate::policy::types::PolicyRules;
use crate::policy::PolicyRegistry;
use crate::script::ScriptPolicy;
use crate::tool::ToolManager;

/// Outcome of one hook (or of the scheduler itself, for the synthetic
/// `dag` cycle failure).
#[derive(Debug, Clone)]
pub struct HookResult {
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub duration: Duration,
    pub output: String,
    pub error: Option<String>,
}

impl HookResult {
    fn skipped(name: &str, reason: &str, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            skipped: true,
            duration,
            output: format!("skipped ({reason})"),
            error: None,
        }
    }
}

/// Run options threaded through the scheduler and dispatcher.
#[derive(Debug, Clone)]
pub struct Options {
    pub verbose: bool,
    pub quiet: bool,
    pub fix: bool,
    pub fail_fast: bool,
    pub dry_run: bool,
    pub use_cache: bool,
    /// Hook names from the `SKIP` environment variable.
    pub skip_hooks: Vec<String>,
    pub platform: Platform,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            verbose: false,
            quiet: false,
            fix: false,
            fail_fast: true,
            dry_run: false,
            use_cache: false,
            skip_hooks: Vec::new(),
            platform: Platform::current(),
        }
    }
}

/// Advisory knobs extracted from the effective policy rules.
#[derive(Debug, Clone, Default)]
struct Advisory {
    enforce_hooks: Vec<String>,
    hook_time_budget_ms: BTreeMap<String, u64>,
    max_parallel_hooks: usize,
}

/// Drives a full run for one hook-type.
pub struct Executor {
    config: Config,
    tools: ToolManager,
    cache: ContentCache,
    registry: PolicyRegistry,
    work_dir: PathBuf,
    opts: Options,
    script_engine: Option<Box<dyn ScriptPolicy>>,
}

impl Executor {
    /// `work_dir` is where hooks execute (the repo root, or a clean-room
    /// checkout); the caches always live under the repo's own directories.
    pub fn new(config: Config, cache_root: &std::path::Path, work_dir: PathBuf) -> Self {
        let cache_dir = cache_root.join(".hooks").join("cache");
        Self {
            tools: ToolManager::new(cache_dir.clone()),
            cache: ContentCache::new(cache_root),
            registry: PolicyRegistry::new(cache_dir),
            config,
            work_dir,
            opts: Options::default(),
            script_engine: None,
        }
    }

    pub fn set_options(&mut self, opts: Options) {
        self.opts = opts;
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Attach an external script-policy engine.
    pub fn set_script_engine(&mut self, engine: Box<dyn ScriptPolicy>) {
        self.script_engine = Some(engine);
    }

    pub fn content_cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn policy_registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Run every hook of `hook_type` against `files`.
    pub async fn run(&self, hook_type: &str, files: &[String], all_files: bool) -> Vec<HookResult> {
        let hooks = self.config.hooks(hook_type);
        if hooks.is_empty() {
            return Vec::new();
        }

        let graph = Graph::build(hooks);
        if graph.has_cycle() {
            return vec![HookResult {
                name: "dag".into(),
                success: false,
                skipped: false,
                duration: Duration::ZERO,
                output: String::new(),
                error: Some("circular dependency detected in hook graph".into()),
            }];
        }

        let plan = graph.execution_plan();
        let advisory = self.advisory_rules().await;

        if self.opts.dry_run {
            return self.project(&plan, files, all_files, &advisory);
        }

        let semaphore = (advisory.max_parallel_hooks > 0)
            .then(|| Arc::new(Semaphore::new(advisory.max_parallel_hooks)));

        let mut results = Vec::new();
        let mut stop = false;

        for batch in plan {
            if stop {
                break;
            }

            let batch_results = futures::future::join_all(batch.iter().map(|&hook| {
                let semaphore = semaphore.clone();
                let advisory = &advisory;
                async move {
                    let _permit = match &semaphore {
                        Some(s) => Some(s.acquire().await.expect("semaphore never closed")),
                        None => None,
                    };
                    self.run_hook(hook, files, all_files, advisory).await
                }
            }))
            .await;

            for (hook, result) in batch.iter().zip(&batch_results) {
                if !result.success && !result.skipped {
                    // Per-hook fail_fast overrides the global setting.
                    if hook.fail_fast.unwrap_or(self.opts.fail_fast) {
                        stop = true;
                    }
                }
            }

            results.extend(batch_results);
        }

        results
    }

    /// Load the configured policies and evaluate them against the
    /// changeset. Returns `None` when no policies are configured; a load
    /// failure surfaces as a single `load` violation.
    pub async fn check_policies(
        &self,
        files: &[String],
        commit_msg: &str,
    ) -> Option<EvalResult> {
        let policies = self.config.policies.as_ref()?;

        let merged = match self.registry.load(policies).await {
            Ok(Some(merged)) => merged,
            Ok(None) => return None,
            Err(e) => {
                return Some(EvalResult {
                    passed: false,
                    violations: vec![Violation {
                        rule: "load".into(),
                        message: e.to_string(),
                    }],
                });
            }
        };

        let mut result = evaluate(&merged.effective_rules, files, commit_msg, &self.work_dir);

        if let Some(engine) = &self.script_engine {
            for script in &policies.script_policies {
                match engine.evaluate(&self.work_dir.join(script), files) {
                    Ok(violations) => result.violations.extend(violations),
                    Err(e) => result.violations.push(Violation {
                        rule: "script".into(),
                        message: format!("{script}: {e}"),
                    }),
                }
            }
            result.passed = result.violations.is_empty();
        }

        Some(result)
    }

    /// Effective rules for the scheduler's advisory fields, best effort.
    /// The registry memory cache makes this cheap after `check_policies`.
    async fn advisory_rules(&self) -> Advisory {
        let Some(policies) = self.config.policies.as_ref() else {
            return Advisory::default();
        };
        let rules: PolicyRules = match self.registry.load(policies).await {
            Ok(Some(merged)) => merged.effective_rules,
            _ => return Advisory::default(),
        };
        Advisory {
            enforce_hooks: rules.enforce_hooks,
            hook_time_budget_ms: rules.hook_time_budget_ms,
            max_parallel_hooks: rules.max_parallel_hooks,
        }
    }
}

/// Parse the comma-separated `SKIP` environment variable.
pub fn parse_skip_env() -> Vec<String> {
    match std::env::var("SKIP") {
        Ok(value) if !value.is_empty() => value.split(',').map(|s| s.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}

/// True when any non-skipped hook failed.
pub fn has_failure(results: &[HookResult]) -> bool {
    results.iter().any(|r| !r.success && !r.skipped)
}
