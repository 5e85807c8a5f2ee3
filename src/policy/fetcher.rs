//! Remote policy fetching
//!
//! HTTPS-only loads with conditional revalidation: a disk-cached policy is
//! revalidated with `HEAD` + `If-None-Match`, a `304` serves the cached
//! copy, anything else falls through to a full `GET`. Network failures fall
//! back to the stale disk copy when one exists.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::HookError;

use super::cache::PolicyCache;
use super::types::RemotePolicy;

/// Shared HTTP timeout for HEAD and GET.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PolicyFetcher {
    client: reqwest::Client,
    cache: PolicyCache,
    require_https: bool,
}

impl PolicyFetcher {
    /// `cache_dir` is the engine cache root; policies live under
    /// `<cache_dir>/policies`.
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("default reqwest client"),
            cache: PolicyCache::new(cache_dir.join("policies")),
            require_https: true,
        }
    }

    /// Fetcher that accepts plain-http URLs, for tests against local mock
    /// servers only.
    #[cfg(test)]
    fn insecure_for_tests(cache_dir: PathBuf) -> Self {
        Self {
            require_https: false,
            ..Self::new(cache_dir)
        }
    }

    /// Load one policy by URL, consulting memory, then disk+revalidation,
    /// then the network.
    pub async fn load_policy(&self, url: &str) -> Result<RemotePolicy, HookError> {
        if self.require_https && !url.starts_with("https://") {
            return Err(HookError::InsecureUrl(url.to_string()));
        }

        if let Some(policy) = self.cache.get_from_memory(url) {
            return Ok(policy);
        }

        let cached = self.cache.get_from_disk(url);
        if let Some((policy, meta)) = &cached {
            if self.check_not_modified(url, &meta.etag).await.unwrap_or(false) {
                tracing::debug!(url, "policy unchanged (304)");
                self.cache.set_in_memory(url, policy.clone());
                return Ok(policy.clone());
            }
        }

        match self.fetch_from_network(url).await {
            Ok((mut policy, body, etag)) => {
                policy.validate()?;
                if let Err(e) = self.cache.save_to_disk(url, &body, &etag) {
                    tracing::debug!(url, error = %e, "failed to write policy cache");
                }
                self.cache.set_in_memory(url, policy.clone());
                Ok(policy)
            }
            Err(err) => {
                // Stale cache beats a hard failure.
                if let Some((policy, _)) = cached {
                    tracing::warn!(url, error = %err, "network failure, using cached policy");
                    self.cache.set_in_memory(url, policy.clone());
                    return Ok(policy);
                }
                Err(err)
            }
        }
    }

    async fn check_not_modified(&self, url: &str, etag: &str) -> Result<bool, HookError> {
        if etag.is_empty() {
            return Ok(false);
        }

        let resp = self
            .client
            .head(url)
            .header("If-None-Match", etag)
            .send()
            .await
            .map_err(|e| HookError::PolicyFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(resp.status() == reqwest::StatusCode::NOT_MODIFIED)
    }

    async fn fetch_from_network(
        &self,
        url: &str,
    ) -> Result<(RemotePolicy, Vec<u8>, String), HookError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HookError::PolicyFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(HookError::PolicyFetch {
                url: url.to_string(),
                reason: format!("HTTP {}", resp.status().as_u16()),
            });
        }

        let etag = resp
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = resp
            .bytes()
            .await
            .map_err(|e| HookError::PolicyFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();

        let policy = parse_remote_policy(&body)?;
        Ok((policy, body, etag))
    }

    pub fn clear_cache(&self) -> std::io::Result<()> {
        self.cache.clear()
    }
}

/// Parse a policy body as YAML, falling back to JSON.
pub fn parse_remote_policy(data: &[u8]) -> Result<RemotePolicy, HookError> {
    if let Ok(policy) = serde_yaml::from_slice::<RemotePolicy>(data) {
        return Ok(policy);
    }
    serde_json::from_slice(data).map_err(|_| HookError::InvalidPolicyFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const POLICY_YAML: &str = "name: baseline\nversion: \"1.0\"\nrules:\n  max_files_changed: 5\n";

    #[test]
    fn parse_accepts_yaml_then_json_then_fails() {
        let yaml = parse_remote_policy(POLICY_YAML.as_bytes()).unwrap();
        assert_eq!(yaml.name, "baseline");

        let json = parse_remote_policy(br#"{"name": "j", "version": "2"}"#).unwrap();
        assert_eq!(json.name, "j");

        let err = parse_remote_policy(b"{broken").unwrap_err();
        assert!(matches!(err, HookError::InvalidPolicyFormat));
    }

    #[tokio::test]
    async fn insecure_url_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let fetcher = PolicyFetcher::new(tmp.path().to_path_buf());
        let err = fetcher.load_policy("http://p/x.yaml").await.unwrap_err();
        assert!(matches!(err, HookError::InsecureUrl(_)));
    }

    #[tokio::test]
    async fn etag_round_trip_serves_cache_on_304() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", "\"v1\"")
                    .set_body_string(POLICY_YAML),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(header("If-None-Match", "\"v1\""))
            .respond_with(ResponseTemplate::new(304))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let url = format!("{}/x.yaml", server.uri());

        // First load populates the disk cache.
        let fetcher = PolicyFetcher::insecure_for_tests(tmp.path().to_path_buf());
        let policy = fetcher.load_policy(&url).await.unwrap();
        assert_eq!(policy.name, "baseline");

        // A fresh fetcher (cold memory) revalidates and gets a 304; the
        // single-GET expectation on the mock proves no body refetch.
        let fetcher = PolicyFetcher::insecure_for_tests(tmp.path().to_path_buf());
        let policy = fetcher.load_policy(&url).await.unwrap();
        assert_eq!(policy.rules.max_files_changed, 5);
    }

    #[tokio::test]
    async fn network_failure_falls_back_to_stale_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", "\"v1\"")
                    .set_body_string(POLICY_YAML),
            )
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let url = format!("{}/x.yaml", server.uri());

        let fetcher = PolicyFetcher::insecure_for_tests(tmp.path().to_path_buf());
        fetcher.load_policy(&url).await.unwrap();

        // Kill the server entirely; a cold fetcher still serves the stale
        // disk copy.
        drop(server);
        let fetcher = PolicyFetcher::insecure_for_tests(tmp.path().to_path_buf());
        let policy = fetcher.load_policy(&url).await.unwrap();
        assert_eq!(policy.name, "baseline");
    }

    #[tokio::test]
    async fn network_failure_without_cache_propagates() {
        let server = MockServer::start().await;
        let url = format!("{}/x.yaml", server.uri());
        drop(server);

        let tmp = TempDir::new().unwrap();
        let fetcher = PolicyFetcher::insecure_for_tests(tmp.path().to_path_buf());
        let err = fetcher.load_policy(&url).await.unwrap_err();
        assert!(matches!(err, HookError::PolicyFetch { .. }));
    }

    #[tokio::test]
    async fn memory_cache_short_circuits_network() {
        let tmp = TempDir::new().unwrap();
        let fetcher = PolicyFetcher::new(tmp.path().to_path_buf());
        let url = "https://unreachable.invalid/x.yaml";

        fetcher.cache.set_in_memory(
            url,
            RemotePolicy {
                name: "warm".into(),
                ..Default::default()
            },
        );
        let policy = fetcher.load_policy(url).await.unwrap();
        assert_eq!(policy.name, "warm");
    }

    #[tokio::test]
    async fn invalid_policy_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{broken"))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let fetcher = PolicyFetcher::insecure_for_tests(tmp.path().to_path_buf());
        let url = format!("{}/x.yaml", server.uri());

        let err = fetcher.load_policy(&url).await.unwrap_err();
        assert!(matches!(err, HookError::InvalidPolicyFormat));
    }
}
