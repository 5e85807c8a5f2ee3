//! Two-tier policy cache
//!
//! In-memory map for the current process plus an on-disk layer at
//! `<dir>/sha256_<hex(sha256(url))>/{metadata.json, policy.yaml}`. The
//! directory name is a pure function of the URL, so distinct URLs never
//! collide on disk.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::SystemTime;

use super::fetcher::parse_remote_policy;
use super::types::RemotePolicy;

/// Sidecar record stored next to each cached policy body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub url: String,
    pub etag: String,
    #[serde(rename = "lastFetched")]
    pub last_fetched: String,
}

pub struct PolicyCache {
    dir: PathBuf,
    memory: RwLock<HashMap<String, RemotePolicy>>,
}

impl PolicyCache {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            memory: RwLock::new(HashMap::new()),
        }
    }

    /// Cache key for a URL: hex sha256.
    pub fn key_for(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    pub fn get_from_memory(&self, url: &str) -> Option<RemotePolicy> {
        self.memory
            .read()
            .ok()?
            .get(&Self::key_for(url))
            .cloned()
    }

    pub fn set_in_memory(&self, url: &str, policy: RemotePolicy) {
        if let Ok(mut memory) = self.memory.write() {
            memory.insert(Self::key_for(url), policy);
        }
    }

    fn entry_dir(&self, url: &str) -> PathBuf {
        self.dir.join(format!("sha256_{}", Self::key_for(url)))
    }

    /// Read the cached policy and its metadata for a URL, if present and
    /// still parseable.
    pub fn get_from_disk(&self, url: &str) -> Option<(RemotePolicy, CacheMetadata)> {
        let dir = self.entry_dir(url);

        let meta_bytes = std::fs::read(dir.join("metadata.json")).ok()?;
        let meta: CacheMetadata = serde_json::from_slice(&meta_bytes).ok()?;

        let body = std::fs::read(dir.join("policy.yaml")).ok()?;
        let policy = parse_remote_policy(&body).ok()?;

        Some((policy, meta))
    }

    /// Persist a policy body and its ETag. Best effort: callers ignore the
    /// result since losing the disk layer only costs a refetch.
    pub fn save_to_disk(&self, url: &str, body: &[u8], etag: &str) -> std::io::Result<()> {
        let dir = self.entry_dir(url);
        std::fs::create_dir_all(&dir)?;

        let meta = CacheMetadata {
            url: url.to_string(),
            etag: etag.to_string(),
            last_fetched: humantime::format_rfc3339(SystemTime::now()).to_string(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;
        std::fs::write(dir.join("metadata.json"), meta_json)?;
        std::fs::write(dir.join("policy.yaml"), body)
    }

    /// Wipe both tiers.
    pub fn clear(&self) -> std::io::Result<()> {
        if let Ok(mut memory) = self.memory.write() {
            memory.clear();
        }
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BODY: &[u8] = b"name: security-baseline\nversion: \"1.0\"\n";

    #[test]
    fn url_to_directory_is_injective() {
        let a = PolicyCache::key_for("https://p/one.yaml");
        let b = PolicyCache::key_for("https://p/two.yaml");
        assert_ne!(a, b);
        assert_eq!(a, PolicyCache::key_for("https://p/one.yaml"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn disk_round_trip_preserves_policy_and_etag() {
        let tmp = TempDir::new().unwrap();
        let cache = PolicyCache::new(tmp.path().join("policies"));
        let url = "https://p/x.yaml";

        assert!(cache.get_from_disk(url).is_none());

        cache.save_to_disk(url, BODY, "\"v1\"").unwrap();
        let (policy, meta) = cache.get_from_disk(url).unwrap();
        assert_eq!(policy.name, "security-baseline");
        assert_eq!(meta.etag, "\"v1\"");
        assert_eq!(meta.url, url);

        let dir = tmp
            .path()
            .join("policies")
            .join(format!("sha256_{}", PolicyCache::key_for(url)));
        assert!(dir.join("metadata.json").is_file());
        assert!(dir.join("policy.yaml").is_file());
    }

    #[test]
    fn memory_tier_is_independent_of_disk() {
        let tmp = TempDir::new().unwrap();
        let cache = PolicyCache::new(tmp.path().join("policies"));
        let url = "https://p/x.yaml";

        assert!(cache.get_from_memory(url).is_none());
        cache.set_in_memory(
            url,
            RemotePolicy {
                name: "mem".into(),
                ..Default::default()
            },
        );
        assert_eq!(cache.get_from_memory(url).unwrap().name, "mem");
        assert!(cache.get_from_disk(url).is_none());
    }

    #[test]
    fn clear_wipes_both_tiers() {
        let tmp = TempDir::new().unwrap();
        let cache = PolicyCache::new(tmp.path().join("policies"));
        let url = "https://p/x.yaml";

        cache.set_in_memory(url, RemotePolicy::default());
        cache.save_to_disk(url, BODY, "").unwrap();

        cache.clear().unwrap();
        assert!(cache.get_from_memory(url).is_none());
        assert!(cache.get_from_disk(url).is_none());
    }
}
