//! Content-cache subcommands

use anyhow::{Context, Result};

use crate::cache::ContentCache;
use crate::cli::CacheCommands;

pub fn execute(cmd: CacheCommands) -> Result<i32> {
    match cmd {
        CacheCommands::Clear => clear(),
    }
}

fn clear() -> Result<i32> {
    let work_dir = std::env::current_dir()?;
    ContentCache::new(&work_dir)
        .clear()
        .context("failed to clear hook cache")?;

    println!("Hook cache cleared");
    Ok(0)
}
