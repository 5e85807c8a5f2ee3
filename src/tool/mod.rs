//! Tool resolution and installation
//!
//! A hook's `tool` either resolves from the host PATH (no spec configured)
//! or from the versioned install cache at `<cache>/<name>-<version>/`.
//! Missing installs are downloaded from the OS-specific URL in the tool
//! spec, hashed while streaming, checked against the declared checksum, and
//! extracted. Only regular archive members whose basename starts with the
//! tool name are kept, written executable into the cache directory.

use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Tool;
use crate::error::HookError;
use crate::platform::Platform;

/// Resolves tool names to executable paths, installing on demand.
pub struct ToolManager {
    cache_dir: PathBuf,
    platform: Platform,
    client: reqwest::Client,
}

impl ToolManager {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self::with_platform(cache_dir, Platform::current())
    }

    pub fn with_platform(cache_dir: PathBuf, platform: Platform) -> Self {
        Self {
            cache_dir,
            platform,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("default reqwest client"),
        }
    }

    /// Resolve `name` to an executable path. Without a spec this is a PATH
    /// lookup; with one, the versioned cache is consulted and populated.
    pub async fn ensure_tool(&self, name: &str, spec: Option<&Tool>) -> Result<PathBuf, HookError> {
        let Some(spec) = spec else {
            return self.find_system_tool(name);
        };

        let cached = self.cached_path(name, &spec.version);
        if cached.is_file() {
            return Ok(cached);
        }

        let os = os_key();
        let url = spec
            .install
            .get(os)
            .ok_or_else(|| HookError::DownloadFailed(format!("no download URL for {name} on {os}")))?;

        self.download_and_extract(name, &spec.version, url, spec.checksum.as_deref())
            .await?;

        Ok(cached)
    }

    /// PATH scan for an executable named `name` (plus `.exe` on Windows).
    pub fn find_system_tool(&self, name: &str) -> Result<PathBuf, HookError> {
        let paths = std::env::var_os("PATH").unwrap_or_default();
        let candidate = self.platform.executable_name(name);

        for dir in std::env::split_paths(&paths) {
            let full = dir.join(&candidate);
            if is_executable(&full) {
                return Ok(full);
            }
        }

        Err(HookError::ToolNotFound(name.to_string()))
    }

    fn cached_path(&self, name: &str, version: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{name}-{version}"))
            .join(self.platform.executable_name(name))
    }

    async fn download_and_extract(
        &self,
        name: &str,
        version: &str,
        url: &str,
        checksum: Option<&str>,
    ) -> Result<(), HookError> {
        tracing::info!(tool = name, version, url, "installing tool");

        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HookError::DownloadFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(HookError::DownloadFailed(format!(
                "HTTP {}",
                resp.status().as_u16()
            )));
        }

        // Stream into a temp file, hashing as we go.
        let mut tmp = tempfile::NamedTempFile::new()?;
        let mut hasher = Sha256::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| HookError::DownloadFailed(e.to_string()))?
        {
            hasher.update(&chunk);
            tmp.write_all(&chunk)?;
        }
        tmp.flush()?;

        if let Some(expected) = checksum.filter(|c| !c.is_empty()) {
            let actual = hex::encode(hasher.finalize());
            if actual != expected {
                return Err(HookError::ChecksumMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        let dest = self.cache_dir.join(format!("{name}-{version}"));
        std::fs::create_dir_all(&dest)?;

        if url.ends_with(".tar.gz") || url.ends_with(".tgz") {
            extract_tar_gz(tmp.path(), &dest, name)
        } else if url.ends_with(".zip") {
            extract_zip(tmp.path(), &dest, name)
        } else {
            Err(HookError::ArchiveUnsupported(url.to_string()))
        }
    }
}

/// OS key used in the tool install map. Follows the original config layout
/// (`linux`, `darwin`, `windows`), so macOS maps to `darwin`.
fn os_key() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        true
    }
}

fn extract_tar_gz(src: &Path, dest: &Path, tool_name: &str) -> Result<(), HookError> {
    let file = std::fs::File::open(src)?;
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?;
        let Some(base) = path.file_name().map(|n| n.to_owned()) else {
            continue;
        };
        if base.to_string_lossy().starts_with(tool_name) {
            let out = dest.join(&base);
            let mut writer = std::fs::File::create(&out)?;
            std::io::copy(&mut entry, &mut writer)?;
            make_executable(&out)?;
        }
    }

    Ok(())
}

fn extract_zip(src: &Path, dest: &Path, tool_name: &str) -> Result<(), HookError> {
    let file = std::fs::File::open(src)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| HookError::DownloadFailed(format!("invalid zip archive: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| HookError::DownloadFailed(format!("invalid zip entry: {e}")))?;
        if entry.is_dir() {
            continue;
        }

        let Some(base) = Path::new(entry.name())
            .file_name()
            .map(|n| n.to_owned())
        else {
            continue;
        };
        if base.to_string_lossy().starts_with(tool_name) {
            let out = dest.join(&base);
            let mut writer = std::fs::File::create(&out)?;
            std::io::copy(&mut entry, &mut writer)?;
            make_executable(&out)?;
        }
    }

    Ok(())
}

fn make_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tar_gz_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
            Vec::new(),
            flate2::Compression::default(),
        ));
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn spec(url: &str, checksum: Option<&str>) -> Tool {
        let mut install = BTreeMap::new();
        install.insert(os_key().to_string(), url.to_string());
        Tool {
            version: "1.0.0".into(),
            install,
            checksum: checksum.map(String::from),
        }
    }

    #[test]
    fn system_lookup_finds_sh() {
        let mgr = ToolManager::new(PathBuf::from("/tmp/unused"));
        assert!(mgr.find_system_tool("sh").is_ok());
        assert!(matches!(
            mgr.find_system_tool("definitely-not-a-real-tool-xyz"),
            Err(HookError::ToolNotFound(_))
        ));
    }

    #[tokio::test]
    async fn install_downloads_verifies_and_extracts() {
        let archive = tar_gz_with(&[
            ("release/mytool", b"#!/bin/sh\necho ok\n"),
            ("release/README.md", b"docs"),
        ]);
        let checksum = hex::encode(Sha256::digest(&archive));

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(archive.clone(), "application/gzip"),
            )
            .mount(&server)
            .await;

        let cache = TempDir::new().unwrap();
        let mgr = ToolManager::new(cache.path().to_path_buf());
        let url = format!("{}/mytool-1.0.0.tar.gz", server.uri());

        let path = mgr
            .ensure_tool("mytool", Some(&spec(&url, Some(&checksum))))
            .await
            .unwrap();
        assert!(path.is_file());
        assert!(path.ends_with("mytool-1.0.0/mytool"));
        // The README does not start with the tool name, so it is skipped.
        assert!(!cache.path().join("mytool-1.0.0/README.md").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = path.metadata().unwrap().permissions().mode();
            assert_eq!(mode & 0o755, 0o755);
        }

        // Second resolve hits the cache; the server is no longer needed.
        drop(server);
        let again = mgr
            .ensure_tool("mytool", Some(&spec(&url, Some(&checksum))))
            .await
            .unwrap();
        assert_eq!(path, again);
    }

    #[tokio::test]
    async fn checksum_mismatch_leaves_no_binary() {
        let archive = tar_gz_with(&[("mytool", b"binary")]);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(archive, "application/gzip"))
            .mount(&server)
            .await;

        let cache = TempDir::new().unwrap();
        let mgr = ToolManager::new(cache.path().to_path_buf());
        let url = format!("{}/mytool-1.0.0.tar.gz", server.uri());
        let bad = "a".repeat(64);

        let err = mgr
            .ensure_tool("mytool", Some(&spec(&url, Some(&bad))))
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::ChecksumMismatch { .. }));
        assert!(!cache.path().join("mytool-1.0.0").exists());
    }

    #[tokio::test]
    async fn non_200_is_a_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = TempDir::new().unwrap();
        let mgr = ToolManager::new(cache.path().to_path_buf());
        let url = format!("{}/mytool-1.0.0.tar.gz", server.uri());

        let err = mgr
            .ensure_tool("mytool", Some(&spec(&url, None)))
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn unknown_archive_suffix_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 8], "application/x"))
            .mount(&server)
            .await;

        let cache = TempDir::new().unwrap();
        let mgr = ToolManager::new(cache.path().to_path_buf());
        let url = format!("{}/mytool-1.0.0.xz", server.uri());

        let err = mgr
            .ensure_tool("mytool", Some(&spec(&url, None)))
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::ArchiveUnsupported(_)));
    }

    #[tokio::test]
    async fn zip_install_extracts_matching_entries() {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default();
            writer.start_file("dist/mytool", opts).unwrap();
            std::io::Write::write_all(&mut writer, b"bin").unwrap();
            writer.start_file("dist/LICENSE", opts).unwrap();
            std::io::Write::write_all(&mut writer, b"mit").unwrap();
            writer.finish().unwrap();
        }
        let archive = buf.into_inner();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(archive, "application/zip"))
            .mount(&server)
            .await;

        let cache = TempDir::new().unwrap();
        let mgr = ToolManager::new(cache.path().to_path_buf());
        let url = format!("{}/mytool-1.0.0.zip", server.uri());

        let path = mgr
            .ensure_tool("mytool", Some(&spec(&url, None)))
            .await
            .unwrap();
        assert!(path.is_file());
        assert!(!cache.path().join("mytool-1.0.0/LICENSE").exists());
    }
}
