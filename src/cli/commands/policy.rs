//! Policy subcommands: list, fetch, clear-cache

use anyhow::{Context, Result};

use crate::cli::PolicyCommands;
use crate::config::Config;
use crate::policy::PolicyRegistry;

pub async fn execute(cmd: PolicyCommands) -> Result<i32> {
    match cmd {
        PolicyCommands::List => list().await,
        PolicyCommands::Fetch => fetch().await,
        PolicyCommands::ClearCache => clear_cache(),
    }
}

fn registry(work_dir: &std::path::Path) -> PolicyRegistry {
    PolicyRegistry::new(work_dir.join(".hooks").join("cache"))
}

async fn list() -> Result<i32> {
    let work_dir = std::env::current_dir()?;
    let (config, _) = Config::load(&work_dir)?;

    println!("Policy Configuration:\n");

    let Some(policies) = &config.policies else {
        println!("No policies configured");
        return Ok(0);
    };

    println!("Type: {}", policies.kind);

    if config.has_remote_policies() {
        println!("\nRemote Policies:");
        for policy_ref in &policies.policies {
            println!("  - {}", policy_ref.url);
        }
    }

    if !policies.local_policies.is_empty() {
        println!("\nLocal Policies:");
        for local in &policies.local_policies {
            println!("  - {}", local.identifier());
        }
    }

    if config.has_remote_policies() {
        match registry(&work_dir).load(policies).await {
            Ok(Some(merged)) => {
                println!("\nLoaded Remote Policies:");
                for remote in &merged.remote_policies {
                    println!("  - {}", remote.identifier());
                }
            }
            Ok(None) => {}
            Err(e) => println!("\nFailed to load policies: {e}"),
        }
    }

    Ok(0)
}

async fn fetch() -> Result<i32> {
    let work_dir = std::env::current_dir()?;
    let (config, _) = Config::load(&work_dir)?;

    let Some(policies) = &config.policies else {
        println!("No remote policies configured");
        return Ok(0);
    };
    if !config.has_remote_policies() {
        println!("No remote policies configured");
        return Ok(0);
    }

    registry(&work_dir)
        .refresh(policies)
        .await
        .context("failed to refresh")?;

    println!("Policies refreshed successfully");
    Ok(0)
}

fn clear_cache() -> Result<i32> {
    let work_dir = std::env::current_dir()?;
    registry(&work_dir)
        .clear_cache()
        .context("failed to clear cache")?;

    println!("Policy cache cleared");
    Ok(0)
}
