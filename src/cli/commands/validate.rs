//! Validate the configuration
//!
//! Checks in order: the config parses, hooks exist, each hook-type's DAG is
//! acyclic, names are unique, `after` references resolve, selector regexes
//! compile, and every referenced tool is resolvable. Errors exit 1;
//! unavailable tools are warnings only.

use anyhow::Result;
use console::style;

use crate::config::Config;
use crate::dag::Graph;
use crate::tool::ToolManager;

const HOOK_TYPES: [&str; 3] = ["pre-commit", "pre-push", "commit-msg"];

pub async fn execute() -> Result<i32> {
    let work_dir = std::env::current_dir()?;
    println!("Validating configuration...\n");

    let (config, path) = match Config::load(&work_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            println!("{} Config file: {e:#}", style("[ERROR]").red());
            println!("\nSuggestion: run 'hookrunner init' to create a config file");
            return Ok(1);
        }
    };
    println!("{} Config file: {}", style("[OK]").green(), path.display());

    let mut errors = 0;
    let mut warnings = 0;

    let total_hooks: usize = HOOK_TYPES.iter().map(|t| config.hooks(t).len()).sum();
    if total_hooks == 0 {
        println!("{} No hooks configured", style("[WARN]").yellow());
        warnings += 1;
    } else {
        println!("{} Hooks configured: {total_hooks}", style("[OK]").green());
    }

    for hook_type in HOOK_TYPES {
        let hooks = config.hooks(hook_type);
        if hooks.is_empty() {
            continue;
        }

        if Graph::build(hooks).has_cycle() {
            println!(
                "{} {hook_type} hooks have circular dependency",
                style("[ERROR]").red()
            );
            println!("Suggestion: check 'after' fields for cycles");
            errors += 1;
        } else {
            println!("{} {hook_type} DAG is valid", style("[OK]").green());
        }
    }

    for issue in config.validate() {
        println!("{} {issue}", style("[ERROR]").red());
        errors += 1;
    }

    // Tool availability is environmental, not a config defect.
    let tools = ToolManager::new(work_dir.join(".hooks").join("cache"));
    let mut checked = std::collections::HashSet::new();
    for hook_type in HOOK_TYPES {
        for hook in config.hooks(hook_type) {
            let Some(name) = hook.tool.as_deref().filter(|t| !t.is_empty()) else {
                continue;
            };
            if !checked.insert(name.to_string()) {
                continue;
            }
            match tools.ensure_tool(name, config.tool(name)).await {
                Ok(_) => println!("{} Tool '{name}' found", style("[OK]").green()),
                Err(e) => {
                    println!("{} Tool '{name}' not available: {e}", style("[WARN]").yellow());
                    warnings += 1;
                }
            }
        }
    }

    println!();
    if errors > 0 {
        println!(
            "{} Validation failed with {errors} error(s) and {warnings} warning(s)",
            style("[FAIL]").red()
        );
        Ok(1)
    } else if warnings > 0 {
        println!(
            "{} Validation passed with {warnings} warning(s)",
            style("[WARN]").yellow()
        );
        Ok(0)
    } else {
        println!("{} Configuration is valid", style("[OK]").green());
        Ok(0)
    }
}
