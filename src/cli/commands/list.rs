//! List configured hooks and tools

use anyhow::Result;

use crate::config::Config;

pub fn execute() -> Result<i32> {
    let work_dir = std::env::current_dir()?;
    let (config, path) = Config::load(&work_dir)?;

    println!("Config: {}\n", path.display());

    for hook_type in ["pre-commit", "pre-push", "commit-msg"] {
        let hooks = config.hooks(hook_type);
        if hooks.is_empty() {
            continue;
        }

        println!("{hook_type}:");
        for hook in hooks {
            let what = hook
                .tool
                .as_deref()
                .or(hook.run.as_deref())
                .or(hook.script.as_deref())
                .unwrap_or("?");
            let after = hook
                .after
                .as_deref()
                .map(|a| format!(" (after: {a})"))
                .unwrap_or_default();
            println!("  - {} ({what}){after}", hook.name);
        }
        println!();
    }

    if !config.tools.is_empty() {
        println!("Tools:");
        for (name, tool) in &config.tools {
            println!("  - {name} v{}", tool.version);
        }
    }

    Ok(0)
}
