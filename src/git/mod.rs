//! Git porcelain collaborator
//!
//! Thin wrappers around the system `git` binary: file listing for the
//! changeset, hook shim installation, and the clean-room checkout the
//! orchestrator can run hooks in. The engine itself never talks to git
//! beyond this module.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

fn git_stdout(args: &[&str], dir: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    let output = cmd
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        anyhow::bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn lines(out: String) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

pub fn find_repo_root() -> Result<PathBuf> {
    let out = git_stdout(&["rev-parse", "--show-toplevel"], None)
        .context("not a git repository")?;
    Ok(PathBuf::from(out.trim()))
}

pub fn is_inside_work_tree() -> bool {
    git_stdout(&["rev-parse", "--is-inside-work-tree"], None)
        .map(|out| out.trim() == "true")
        .unwrap_or(false)
}

/// Files staged for the next commit (added/copied/modified/renamed).
pub fn staged_files() -> Result<Vec<String>> {
    git_stdout(
        &["diff", "--cached", "--name-only", "--diff-filter=ACMR"],
        None,
    )
    .map(lines)
}

/// Every tracked file.
pub fn all_files() -> Result<Vec<String>> {
    git_stdout(&["ls-files"], None).map(lines)
}

/// Write a `.git/hooks/<hook_type>` shim that re-enters this binary. The
/// commit-msg shim forwards the message file path.
pub fn install_hook(hook_type: &str, binary: &Path) -> Result<()> {
    let hooks_dir = find_repo_root()?.join(".git").join("hooks");
    std::fs::create_dir_all(&hooks_dir).context("failed to create hooks directory")?;

    let binary = binary.to_string_lossy().replace('\\', "/");
    let forward = if hook_type == "commit-msg" {
        " \"$1\""
    } else {
        ""
    };
    let content = format!("#!/bin/sh\nexec \"{binary}\" run {hook_type}{forward}\n");

    let hook_path = hooks_dir.join(hook_type);
    std::fs::write(&hook_path, content).context("failed to write hook")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&hook_path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

pub fn uninstall_hook(hook_type: &str) -> Result<()> {
    let hook_path = find_repo_root()?.join(".git").join("hooks").join(hook_type);
    if hook_path.exists() {
        std::fs::remove_file(&hook_path).context("failed to remove hook")?;
    }
    Ok(())
}

/// Check out the index into a fresh temp directory: only staged content,
/// no unstaged edits, no untracked files. The caller owns cleanup.
pub fn create_clean_room() -> Result<PathBuf> {
    let repo_root = find_repo_root()?;
    let temp = tempfile::Builder::new()
        .prefix("hookrunner-cleanroom-")
        .tempdir()
        .context("failed to create temp directory")?
        .keep();

    let prefix = format!("{}/", temp.display());
    let output = Command::new("git")
        .args(["checkout-index", "--all", &format!("--prefix={prefix}")])
        .current_dir(&repo_root)
        .output()
        .context("failed to run git checkout-index")?;

    if !output.status.success() {
        let _ = std::fs::remove_dir_all(&temp);
        anyhow::bail!(
            "failed to extract staged files: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(temp)
}

pub fn cleanup_clean_room(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::remove_dir_all(path).context("failed to remove clean-room directory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .args(args)
                .current_dir(tmp.path())
                .status()
                .unwrap();
            assert!(status.success(), "git {args:?} failed");
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test"]);
        tmp
    }

    // The cwd is process-wide state, so tests that swap it must not overlap.
    static CWD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn in_dir<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let prev = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        let out = f();
        std::env::set_current_dir(prev).unwrap();
        out
    }

    #[test]
    fn staged_and_all_files_track_the_index() {
        let repo = init_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        std::fs::write(repo.path().join("b.txt"), "b").unwrap();

        in_dir(repo.path(), || {
            assert!(is_inside_work_tree());
            assert!(staged_files().unwrap().is_empty());

            let status = Command::new("git").args(["add", "a.txt"]).status().unwrap();
            assert!(status.success());

            assert_eq!(staged_files().unwrap(), vec!["a.txt"]);
            assert_eq!(all_files().unwrap(), vec!["a.txt"]);
        });
    }

    #[test]
    fn install_writes_executable_shim_and_uninstall_removes_it() {
        let repo = init_repo();

        in_dir(repo.path(), || {
            install_hook("pre-commit", Path::new("/usr/local/bin/hookrunner")).unwrap();
            let shim = repo.path().join(".git/hooks/pre-commit");
            let content = std::fs::read_to_string(&shim).unwrap();
            assert!(content.contains("run pre-commit"));

            install_hook("commit-msg", Path::new("/usr/local/bin/hookrunner")).unwrap();
            let msg_shim =
                std::fs::read_to_string(repo.path().join(".git/hooks/commit-msg")).unwrap();
            assert!(msg_shim.contains("run commit-msg \"$1\""));

            uninstall_hook("pre-commit").unwrap();
            assert!(!shim.exists());
            // Removing an absent hook is not an error.
            uninstall_hook("pre-commit").unwrap();
        });
    }

    #[test]
    fn clean_room_contains_only_staged_content() {
        let repo = init_repo();
        std::fs::write(repo.path().join("staged.txt"), "staged").unwrap();
        std::fs::write(repo.path().join("untracked.txt"), "untracked").unwrap();

        in_dir(repo.path(), || {
            let status = Command::new("git")
                .args(["add", "staged.txt"])
                .status()
                .unwrap();
            assert!(status.success());

            let room = create_clean_room().unwrap();
            assert!(room.join("staged.txt").is_file());
            assert!(!room.join("untracked.txt").exists());

            cleanup_clean_room(&room).unwrap();
            assert!(!room.exists());
        });
    }
}
