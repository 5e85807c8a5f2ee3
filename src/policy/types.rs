//! Policy data model and merge semantics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::HookError;

/// Reference to a remote policy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRef {
    pub url: String,
}

/// A forbidden content pattern with an optional human description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPattern {
    pub pattern: String,
    pub description: String,
}

/// Commit-message constraint. `error` overrides the default message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitMessageRule {
    pub regex: String,
    pub error: String,
}

/// The open rule set every policy carries. Each field is independently
/// evaluable; zero or empty means "not set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRules {
    pub forbid_files: Vec<String>,
    pub forbid_directories: Vec<String>,
    pub forbid_file_extensions: Vec<String>,
    pub required_files: Vec<String>,
    pub max_file_size_kb: u64,
    pub max_files_changed: usize,
    pub forbid_file_content: Vec<ContentPattern>,
    /// Secret heuristics; descriptions come from the built-in table.
    pub regex_block: Vec<String>,
    pub commit_message: Option<CommitMessageRule>,

    // Advisory fields the scheduler may honor.
    pub enforce_hooks: Vec<String>,
    pub hook_time_budget_ms: BTreeMap<String, u64>,
    pub max_parallel_hooks: usize,
}

/// Policy fetched from a remote URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemotePolicy {
    pub name: String,
    /// Legacy alias for `name`; promoted during validation.
    pub id: String,
    pub version: String,
    pub description: String,
    pub rules: PolicyRules,
    pub metadata: BTreeMap<String, String>,
}

/// Policy declared inline in the user config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalPolicy {
    pub name: String,
    pub version: String,
    pub description: String,
    pub rules: PolicyRules,
    pub metadata: BTreeMap<String, String>,
}

/// All loaded policies plus the folded effective rule set.
#[derive(Debug, Clone, Default)]
pub struct MergedPolicy {
    pub remote_policies: Vec<RemotePolicy>,
    pub local_policies: Vec<LocalPolicy>,
    pub effective_rules: PolicyRules,
}

fn identifier(name: &str, version: &str) -> String {
    if version.is_empty() {
        name.to_string()
    } else {
        format!("{name}@{version}")
    }
}

impl RemotePolicy {
    pub fn identifier(&self) -> String {
        identifier(&self.name, &self.version)
    }

    /// Name must be present (via `name` or `id`); version must be dotted
    /// numeric, `"local"`, or empty.
    pub fn validate(&mut self) -> Result<(), HookError> {
        if self.name.is_empty() && !self.id.is_empty() {
            self.name = self.id.clone();
        }
        if self.name.is_empty() {
            return Err(HookError::Validation("policy name required".into()));
        }
        if !self.version.is_empty() && self.version != "local" && !is_dotted_numeric(&self.version)
        {
            return Err(HookError::Validation(format!(
                "version must be dotted numeric or 'local': {}",
                self.version
            )));
        }
        Ok(())
    }
}

impl LocalPolicy {
    pub fn identifier(&self) -> String {
        identifier(&self.name, &self.version)
    }
}

fn is_dotted_numeric(version: &str) -> bool {
    !version.is_empty() && version.split('.').all(|part| {
        !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
    })
}

impl PolicyRules {
    /// Merge `other` on top of this rule set.
    ///
    /// Scalar caps: any nonzero value in `other` wins. List rules:
    /// deduplicated union preserving declaration order. Commit message:
    /// field-wise last writer wins. Content patterns: concatenated.
    /// An overlay can therefore never reset a scalar back to unset.
    pub fn merge(&self, other: &PolicyRules) -> PolicyRules {
        let mut result = self.clone();

        if other.max_files_changed > 0 {
            result.max_files_changed = other.max_files_changed;
        }
        if other.max_file_size_kb > 0 {
            result.max_file_size_kb = other.max_file_size_kb;
        }
        if other.max_parallel_hooks > 0 {
            result.max_parallel_hooks = other.max_parallel_hooks;
        }

        append_unique(&mut result.forbid_directories, &other.forbid_directories);
        append_unique(&mut result.forbid_files, &other.forbid_files);
        append_unique(
            &mut result.forbid_file_extensions,
            &other.forbid_file_extensions,
        );
        append_unique(&mut result.required_files, &other.required_files);
        append_unique(&mut result.enforce_hooks, &other.enforce_hooks);
        append_unique(&mut result.regex_block, &other.regex_block);

        result
            .forbid_file_content
            .extend(other.forbid_file_content.iter().cloned());

        if let Some(other_cm) = &other.commit_message {
            let cm = result.commit_message.get_or_insert_with(Default::default);
            if !other_cm.regex.is_empty() {
                cm.regex = other_cm.regex.clone();
            }
            if !other_cm.error.is_empty() {
                cm.error = other_cm.error.clone();
            }
        }

        for (hook, budget) in &other.hook_time_budget_ms {
            result.hook_time_budget_ms.insert(hook.clone(), *budget);
        }

        result
    }
}

fn append_unique(base: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !base.iter().any(|existing| existing == item) {
            base.push(item.clone());
        }
    }
}
