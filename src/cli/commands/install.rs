//! Install and remove git hook shims

use anyhow::{Context, Result};

use crate::config::Config;
use crate::git;

const HOOK_TYPES: [&str; 3] = ["pre-commit", "pre-push", "commit-msg"];

pub fn install() -> Result<i32> {
    if !git::is_inside_work_tree() {
        anyhow::bail!("not inside a git repository");
    }

    let work_dir = std::env::current_dir()?;
    let (config, _) = Config::load(&work_dir)?;
    let executable = std::env::current_exe().context("failed to get executable path")?;

    let mut installed = 0;
    for hook_type in HOOK_TYPES {
        if config.hooks(hook_type).is_empty() {
            continue;
        }
        git::install_hook(hook_type, &executable)
            .with_context(|| format!("failed to install {hook_type} hook"))?;
        println!("Installed {hook_type} hook");
        installed += 1;
    }

    if installed == 0 {
        println!("No hooks to install");
    }
    Ok(0)
}

pub fn uninstall() -> Result<i32> {
    if !git::is_inside_work_tree() {
        anyhow::bail!("not inside a git repository");
    }

    for hook_type in HOOK_TYPES {
        git::uninstall_hook(hook_type)
            .with_context(|| format!("failed to uninstall {hook_type} hook"))?;
    }

    println!("Removed {} hooks", HOOK_TYPES.len());
    Ok(0)
}
