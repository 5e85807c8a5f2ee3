//! Create a default config file

use anyhow::{Context, Result};

use crate::config;

pub fn execute() -> Result<i32> {
    let work_dir = std::env::current_dir()?;
    let path = work_dir.join("hooks.yaml");
    if path.exists() {
        anyhow::bail!("config file already exists: {}", path.display());
    }

    std::fs::write(&path, config::default_config()).context("failed to create config")?;

    println!("Created {}", path.display());
    println!("Run 'hookrunner install' to install git hooks");
    Ok(0)
}
