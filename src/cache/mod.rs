//! Per-file hook result cache
//!
//! A hook that passed for a file records an empty sentinel under
//! `<work>/.hookrunner/cache/<hook>/<64-hex>.ok`. The sentinel name is a
//! pure function of the file bytes and the hook identity, so editing the
//! file or changing the hook's tool, args, or selectors makes the old
//! sentinel unreachable. Stale sentinels are only reclaimed by `clear`.
//!
//! The cache is strictly an optimization: files that cannot be read count
//! as uncached, and sentinel writes that fail are ignored.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::config::Hook;

/// Content-addressed pass/fail memory for hook runs.
pub struct ContentCache {
    root: PathBuf,
}

/// Hash of a hook's behavior-affecting fields: invocation (tool, args, run,
/// script) and file selectors. The non-content half of every cache key.
pub fn identity_hash(hook: &Hook) -> String {
    let mut hasher = Sha256::new();
    hasher.update(hook.tool.as_deref().unwrap_or(""));
    hasher.update(hook.args.join("|"));
    hasher.update(hook.run.as_deref().unwrap_or(""));
    hasher.update(hook.script.as_deref().unwrap_or(""));
    hasher.update(hook.files.as_deref().unwrap_or(""));
    hasher.update(hook.glob.as_deref().unwrap_or(""));
    hasher.update(hook.exclude.as_deref().unwrap_or(""));
    hex::encode(hasher.finalize())
}

impl ContentCache {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            root: work_dir.join(".hookrunner").join("cache"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Split `files` into (cached, uncached) for one hook. A file is cached
    /// when the sentinel for its current contents exists.
    pub fn partition(
        &self,
        hook_name: &str,
        files: &[String],
        identity: &str,
        work_dir: &Path,
    ) -> (Vec<String>, Vec<String>) {
        let mut cached = Vec::new();
        let mut uncached = Vec::new();

        for file in files {
            match self.sentinel_path(hook_name, file, identity, work_dir) {
                Some(path) if path.is_file() => cached.push(file.clone()),
                _ => uncached.push(file.clone()),
            }
        }

        (cached, uncached)
    }

    /// Record a pass for each file. Write failures lose a future skip and
    /// nothing else.
    pub fn mark_passed(&self, hook_name: &str, files: &[String], identity: &str, work_dir: &Path) {
        for file in files {
            if let Some(path) = self.sentinel_path(hook_name, file, identity, work_dir) {
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                if let Err(e) = std::fs::write(&path, b"") {
                    tracing::debug!(file, error = %e, "failed to write cache sentinel");
                }
            }
        }
    }

    /// Drop recorded passes for the given files.
    pub fn invalidate(&self, hook_name: &str, files: &[String], identity: &str, work_dir: &Path) {
        for file in files {
            if let Some(path) = self.sentinel_path(hook_name, file, identity, work_dir) {
                let _ = std::fs::remove_file(path);
            }
        }
    }

    /// Wipe the cache root.
    pub fn clear(&self) -> std::io::Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// Sentinel count and total on-disk size, for diagnostics.
    pub fn stats(&self) -> (usize, u64) {
        let mut count = 0;
        let mut size = 0;
        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                if let Ok(inner) = std::fs::read_dir(entry.path()) {
                    for file in inner.flatten() {
                        count += 1;
                        size += file.metadata().map(|m| m.len()).unwrap_or(0);
                    }
                }
            }
        }
        (count, size)
    }

    fn sentinel_path(
        &self,
        hook_name: &str,
        file: &str,
        identity: &str,
        work_dir: &Path,
    ) -> Option<PathBuf> {
        let bytes = std::fs::read(work_dir.join(file)).ok()?;
        let file_hash = hex::encode(Sha256::digest(&bytes));

        let mut hasher = Sha256::new();
        hasher.update(&file_hash);
        hasher.update(identity);
        let key = hex::encode(hasher.finalize());

        Some(
            self.root
                .join(sanitize(hook_name))
                .join(format!("{key}.ok")),
        )
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lint_hook() -> Hook {
        Hook {
            name: "lint".into(),
            tool: Some("linter".into()),
            args: vec!["--strict".into()],
            files: Some("\\.go$".into()),
            ..Default::default()
        }
    }

    #[test]
    fn identity_hash_changes_with_behavior_fields() {
        let base = lint_hook();
        let h = identity_hash(&base);

        let mut changed = base.clone();
        changed.args = vec!["--lenient".into()];
        assert_ne!(h, identity_hash(&changed));

        let mut changed = base.clone();
        changed.exclude = Some("vendor/".into());
        assert_ne!(h, identity_hash(&changed));

        let mut changed = base.clone();
        changed.tool = Some("other".into());
        assert_ne!(h, identity_hash(&changed));

        assert_eq!(h, identity_hash(&base.clone()));
    }

    #[test]
    fn pass_then_mutate_then_revert() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path();
        std::fs::write(work.join("x.go"), "package main\n").unwrap();

        let cache = ContentCache::new(work);
        let hook = lint_hook();
        let identity = identity_hash(&hook);
        let files = vec!["x.go".to_string()];

        // Nothing recorded yet.
        let (cached, uncached) = cache.partition("lint", &files, &identity, work);
        assert!(cached.is_empty());
        assert_eq!(uncached, files);

        cache.mark_passed("lint", &files, &identity, work);
        let (cached, uncached) = cache.partition("lint", &files, &identity, work);
        assert_eq!(cached, files);
        assert!(uncached.is_empty());

        // Mutating the file invalidates its key.
        std::fs::write(work.join("x.go"), "package main // edited\n").unwrap();
        let (cached, uncached) = cache.partition("lint", &files, &identity, work);
        assert!(cached.is_empty());
        assert_eq!(uncached, files);

        // Reverting restores the original key, so the old sentinel applies.
        std::fs::write(work.join("x.go"), "package main\n").unwrap();
        let (cached, uncached) = cache.partition("lint", &files, &identity, work);
        assert_eq!(cached, files);
        assert!(uncached.is_empty());
    }

    #[test]
    fn changed_hook_identity_misses() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path();
        std::fs::write(work.join("x.go"), "package main\n").unwrap();

        let cache = ContentCache::new(work);
        let hook = lint_hook();
        let files = vec!["x.go".to_string()];
        cache.mark_passed("lint", &files, &identity_hash(&hook), work);

        let mut changed = hook.clone();
        changed.args.push("--fast".into());
        let (cached, uncached) = cache.partition("lint", &files, &identity_hash(&changed), work);
        assert!(cached.is_empty());
        assert_eq!(uncached, files);
    }

    #[test]
    fn unreadable_file_counts_as_uncached() {
        let tmp = TempDir::new().unwrap();
        let cache = ContentCache::new(tmp.path());
        let files = vec!["does-not-exist.go".to_string()];

        let (cached, uncached) = cache.partition("lint", &files, "id", tmp.path());
        assert!(cached.is_empty());
        assert_eq!(uncached, files);

        // mark_passed on an unreadable file is a no-op, not a panic.
        cache.mark_passed("lint", &files, "id", tmp.path());
    }

    #[test]
    fn invalidate_and_clear_remove_sentinels() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path();
        std::fs::write(work.join("x.go"), "x").unwrap();

        let cache = ContentCache::new(work);
        let identity = identity_hash(&lint_hook());
        let files = vec!["x.go".to_string()];

        cache.mark_passed("lint", &files, &identity, work);
        cache.invalidate("lint", &files, &identity, work);
        let (cached, _) = cache.partition("lint", &files, &identity, work);
        assert!(cached.is_empty());

        cache.mark_passed("lint", &files, &identity, work);
        cache.clear().unwrap();
        assert!(!cache.root().exists());
    }

    #[test]
    fn hook_names_are_sanitized_for_paths() {
        assert_eq!(sanitize("go vet ./..."), "go_vet_._...");
        assert_eq!(sanitize("lint-v2"), "lint-v2");
    }
}
