//! Policy registry
//!
//! Loads every remote policy in the order the user config declares them,
//! appends the local policies, and folds all rule sets left to right into
//! one effective rule set. Locals merge last, so they win scalar fields.

use std::path::PathBuf;

use crate::config::Policies;
use crate::error::HookError;

use super::fetcher::PolicyFetcher;
use super::types::MergedPolicy;

pub struct PolicyRegistry {
    fetcher: PolicyFetcher,
}

impl PolicyRegistry {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            fetcher: PolicyFetcher::new(cache_dir),
        }
    }

    /// Load and merge the configured policy set. Returns `None` when the
    /// config declares no policies at all.
    pub async fn load(&self, policies: &Policies) -> Result<Option<MergedPolicy>, HookError> {
        if policies.policies.is_empty() && policies.local_policies.is_empty() {
            return Ok(None);
        }

        let mut merged = MergedPolicy {
            local_policies: policies.local_policies.clone(),
            ..Default::default()
        };

        for policy_ref in &policies.policies {
            let remote = self.fetcher.load_policy(&policy_ref.url).await?;
            merged.remote_policies.push(remote);
        }

        let mut effective = super::types::PolicyRules::default();
        for remote in &merged.remote_policies {
            effective = effective.merge(&remote.rules);
        }
        for local in &merged.local_policies {
            effective = effective.merge(&local.rules);
        }
        merged.effective_rules = effective;

        Ok(Some(merged))
    }

    /// Drop all cached policies and reload from the network.
    pub async fn refresh(&self, policies: &Policies) -> Result<(), HookError> {
        self.fetcher.clear_cache()?;
        self.load(policies).await?;
        Ok(())
    }

    /// Wipe the policy cache, memory and disk.
    pub fn clear_cache(&self) -> Result<(), HookError> {
        self.fetcher.clear_cache()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::types::{LocalPolicy, PolicyRules};
    use tempfile::TempDir;

    fn local(name: &str, rules: PolicyRules) -> LocalPolicy {
        LocalPolicy {
            name: name.into(),
            rules,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_policy_block_yields_none() {
        let tmp = TempDir::new().unwrap();
        let registry = PolicyRegistry::new(tmp.path().to_path_buf());
        let merged = registry.load(&Policies::default()).await.unwrap();
        assert!(merged.is_none());
    }

    #[tokio::test]
    async fn locals_fold_in_declaration_order() {
        let tmp = TempDir::new().unwrap();
        let registry = PolicyRegistry::new(tmp.path().to_path_buf());

        let policies = Policies {
            local_policies: vec![
                local(
                    "first",
                    PolicyRules {
                        max_files_changed: 10,
                        forbid_directories: vec!["vendor/".into()],
                        ..Default::default()
                    },
                ),
                local(
                    "second",
                    PolicyRules {
                        max_files_changed: 3,
                        forbid_directories: vec!["dist/".into()],
                        ..Default::default()
                    },
                ),
            ],
            ..Default::default()
        };

        let merged = registry.load(&policies).await.unwrap().unwrap();
        assert_eq!(merged.effective_rules.max_files_changed, 3);
        assert_eq!(
            merged.effective_rules.forbid_directories,
            vec!["vendor/", "dist/"]
        );
        assert_eq!(merged.local_policies.len(), 2);
        assert!(merged.remote_policies.is_empty());
    }
}
