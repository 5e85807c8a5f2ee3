//! Configuration model and loading
//!
//! The config file is discovered in the work directory as `hooks.yaml`,
//! `hooks.yml`, or `hooks.json`, in that order. An optional overlay file
//! `hooks-local.{yaml,yml,json}` is merged on top: `exclude_tags` are
//! concatenated, `parallel` is OR'd, `scripts_dir` is overridden when set,
//! and overlay hooks replace same-named base hooks per hook-type.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::HookError;
use crate::policy::types::{LocalPolicy, PolicyRef};

/// A downloadable tool pinned to a version.
///
/// Identity for the install cache is `(name, version)`; the `install` map is
/// keyed by OS (`linux`, `darwin`, `windows`) and consulted once per install.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tool {
    pub version: String,
    pub install: BTreeMap<String, String>,
    pub checksum: Option<String>,
}

/// One declarative check, registered under a hook-type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Hook {
    pub name: String,

    // Invocation mode: exactly one of tool / run / script.
    pub tool: Option<String>,
    pub run: Option<String>,
    pub script: Option<String>,
    pub runner: Option<String>,
    pub args: Vec<String>,
    pub fix_args: Vec<String>,

    // File selectors.
    pub files: Option<String>,
    pub glob: Option<String>,
    pub exclude: Option<String>,

    // Scheduling.
    pub after: Option<String>,
    pub timeout: Option<String>,
    pub fail_fast: Option<bool>,

    // Environment and gating.
    pub env: BTreeMap<String, String>,
    pub pass_env: Vec<String>,
    pub skip: Option<String>,
    pub only: Option<String>,
    pub tags: Vec<String>,

    /// Working directory offset below the work dir.
    pub root: Option<String>,

    /// Re-stage files touched by fix mode. Not interpreted by the engine.
    pub stage_fixed: bool,
}

/// How a hook turns into a process: a managed tool with args, a shell
/// command line, or a script file run by an interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Tool { name: String, args: Vec<String> },
    Run { command: String },
    Script { path: String, runner: Option<String> },
}

impl Hook {
    /// Resolve the invocation mode. `run` takes priority over `script`,
    /// which takes priority over `tool`; a hook with none of the three is
    /// malformed.
    pub fn invocation(&self, fix: bool) -> Result<Invocation, HookError> {
        if let Some(cmd) = self.run.as_deref().filter(|s| !s.is_empty()) {
            return Ok(Invocation::Run {
                command: cmd.to_string(),
            });
        }
        if let Some(script) = self.script.as_deref().filter(|s| !s.is_empty()) {
            return Ok(Invocation::Script {
                path: script.to_string(),
                runner: self.runner.clone().filter(|s| !s.is_empty()),
            });
        }
        if let Some(tool) = self.tool.as_deref().filter(|s| !s.is_empty()) {
            let args = if fix && !self.fix_args.is_empty() {
                self.fix_args.clone()
            } else {
                self.args.clone()
            };
            return Ok(Invocation::Tool {
                name: tool.to_string(),
                args,
            });
        }
        Err(HookError::InvalidHookShape)
    }
}

/// Policy block of the user config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Policies {
    #[serde(rename = "type")]
    pub kind: String,
    pub policies: Vec<PolicyRef>,
    #[serde(rename = "localPolicies")]
    pub local_policies: Vec<LocalPolicy>,
    /// Opaque script policies, evaluated by an external engine when one is
    /// attached (see [`crate::script`]).
    #[serde(rename = "scriptPolicies")]
    pub script_policies: Vec<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: BTreeMap<String, Tool>,
    pub hooks: BTreeMap<String, Vec<Hook>>,
    pub policies: Option<Policies>,
    pub exclude_tags: Vec<String>,
    pub parallel: bool,
    pub scripts_dir: Option<String>,
}

const CANDIDATES: [&str; 3] = ["hooks.yaml", "hooks.yml", "hooks.json"];
const LOCAL_CANDIDATES: [&str; 3] = ["hooks-local.yaml", "hooks-local.yml", "hooks-local.json"];

impl Config {
    /// Discover and load the config from `dir`, applying the local overlay.
    /// Returns the config and the path it was loaded from.
    pub fn load(dir: &Path) -> Result<(Config, PathBuf)> {
        for name in CANDIDATES {
            let path = dir.join(name);
            if path.is_file() {
                let mut cfg = Self::load_file(&path)?;
                if let Some(local) = Self::load_local(dir)? {
                    cfg.merge(local);
                }
                return Ok((cfg, path));
            }
        }
        anyhow::bail!("no config file found (hooks.yaml, hooks.yml, or hooks.json)")
    }

    fn load_local(dir: &Path) -> Result<Option<Config>> {
        for name in LOCAL_CANDIDATES {
            let path = dir.join(name);
            if path.is_file() {
                return Ok(Some(Self::load_file(&path)?));
            }
        }
        Ok(None)
    }

    /// Parse a single config file by extension.
    pub fn load_file(path: &Path) -> Result<Config> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&data)
                .with_context(|| format!("invalid JSON config: {}", path.display())),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&data)
                .with_context(|| format!("invalid YAML config: {}", path.display())),
            other => anyhow::bail!("unsupported config format: {:?}", other.unwrap_or("")),
        }
    }

    /// Merge an overlay config on top of this one.
    pub fn merge(&mut self, overlay: Config) {
        self.exclude_tags.extend(overlay.exclude_tags);
        self.parallel = self.parallel || overlay.parallel;
        if overlay.scripts_dir.as_deref().is_some_and(|s| !s.is_empty()) {
            self.scripts_dir = overlay.scripts_dir;
        }
        for (hook_type, hooks) in overlay.hooks {
            let base = self.hooks.entry(hook_type).or_default();
            for hook in hooks {
                match base.iter_mut().find(|b| b.name == hook.name) {
                    Some(existing) => *existing = hook,
                    None => base.push(hook),
                }
            }
        }
    }

    /// Hooks registered for one hook-type, in declaration order.
    pub fn hooks(&self, hook_type: &str) -> &[Hook] {
        self.hooks.get(hook_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn has_remote_policies(&self) -> bool {
        self.policies
            .as_ref()
            .is_some_and(|p| p.kind == "raw" && !p.policies.is_empty())
    }

    /// Static checks over the hook tables: unique names, resolvable `after`
    /// references, compilable selector regexes, well-formed invocation shape.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (hook_type, hooks) in &self.hooks {
            let mut names = std::collections::HashSet::new();
            for hook in hooks {
                if !names.insert(hook.name.as_str()) {
                    errors.push(format!(
                        "duplicate hook name '{}' in {}",
                        hook.name, hook_type
                    ));
                }
            }

            for hook in hooks {
                if let Some(after) = hook.after.as_deref().filter(|a| !a.is_empty()) {
                    if !names.contains(after) {
                        errors.push(format!(
                            "hook '{}' references unknown hook '{}' in 'after'",
                            hook.name, after
                        ));
                    }
                }

                for (field, pattern) in [("files", &hook.files), ("exclude", &hook.exclude)] {
                    if let Some(p) = pattern.as_deref().filter(|p| !p.is_empty()) {
                        if let Err(e) = regex::Regex::new(p) {
                            errors.push(format!(
                                "hook '{}' has invalid '{}' regex: {}",
                                hook.name, field, e
                            ));
                        }
                    }
                }

                if hook.invocation(false).is_err() {
                    errors.push(format!(
                        "hook '{}' must set exactly one of tool, run, or script",
                        hook.name
                    ));
                }
            }
        }

        errors
    }
}

/// Default config written by `hookrunner init`.
pub fn default_config() -> &'static str {
    r#"tools:
  golangci-lint:
    version: 1.55.2
    install:
      windows: https://github.com/golangci/golangci-lint/releases/download/v1.55.2/golangci-lint-1.55.2-windows-amd64.zip
      linux: https://github.com/golangci/golangci-lint/releases/download/v1.55.2/golangci-lint-1.55.2-linux-amd64.tar.gz
      darwin: https://github.com/golangci/golangci-lint/releases/download/v1.55.2/golangci-lint-1.55.2-darwin-amd64.tar.gz

policies:
  type: raw
  policies:
    - url: https://policies.example.dev/default.yaml
  localPolicies:
    - name: commit-style
      rules:
        commit_message:
          regex: "^(feat|fix|chore|docs|refactor|test):"

hooks:
  pre-commit:
    - name: fmt
      run: cargo fmt --check
      files: "\\.rs$"

    - name: lint
      run: cargo clippy -- -D warnings
      files: "\\.rs$"
      after: fmt

  pre-push:
    - name: test
      run: cargo test
      timeout: 5m
"#
}
