//! Terminal output and result rendering
//!
//! Rendering is split from printing so tests can assert on the exact text:
//! the pure `render_*` functions build the report, and [`Output`] writes it
//! through console styling. Quiet mode suppresses everything except the
//! process exit code.

use console::style;
use std::time::Duration;

use crate::executor::HookResult;
use crate::policy::EvalResult;

/// Sink for run results. The console implementation below is the only one
/// shipped; tests substitute their own.
pub trait Reporter {
    fn results(&self, results: &[HookResult]);
    fn policy(&self, result: &EvalResult);
}

/// Console reporter and general-purpose message printer.
pub struct Output {
    pub verbose: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("[OK]").green().bold(), message);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("[WARN]").yellow().bold(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("[ERROR]").red().bold(), message);
    }
}

impl Reporter for Output {
    fn results(&self, results: &[HookResult]) {
        if self.quiet {
            return;
        }
        print!("{}", render_results(results, self.verbose));
    }

    fn policy(&self, result: &EvalResult) {
        if self.quiet {
            return;
        }
        print!("{}", render_policy(result));
    }
}

/// One line per hook plus a summary line.
pub fn render_results(results: &[HookResult], verbose: bool) -> String {
    let mut out = String::new();
    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;
    let mut total = Duration::ZERO;

    for r in results {
        total += r.duration;

        if r.skipped {
            skipped += 1;
            if verbose {
                out.push_str(&format!(
                    "{} {} ({}) - {}\n",
                    style("[SKIP]").yellow(),
                    r.name,
                    format_duration(r.duration),
                    r.output
                ));
            }
            continue;
        }

        if r.success {
            passed += 1;
            out.push_str(&format!(
                "{} {} ({})\n",
                style("[PASS]").green(),
                r.name,
                format_duration(r.duration)
            ));
            if verbose && !r.output.is_empty() {
                out.push_str(&indent(&r.output));
            }
        } else {
            failed += 1;
            out.push_str(&format!(
                "{} {} ({})\n",
                style("[FAIL]").red(),
                r.name,
                format_duration(r.duration)
            ));
            if let Some(error) = &r.error {
                out.push_str(&format!("  Error: {error}\n"));
            }
            if !r.output.is_empty() {
                out.push_str(&indent(&r.output));
            }
        }
    }

    out.push_str(&format!(
        "\n{passed} passed, {failed} failed, {skipped} skipped in {}\n",
        format_duration(total)
    ));
    out
}

/// Policy verdict, with one line per violation on failure.
pub fn render_policy(result: &EvalResult) -> String {
    if result.passed {
        return format!("{} policies\n", style("[PASS]").green());
    }

    let mut out = format!("{} policies\n", style("[FAIL]").red());
    for v in &result.violations {
        out.push_str(&format!("  [{}] {}\n", v.rule, v.message));
    }
    out
}

fn indent(text: &str) -> String {
    let mut out = String::new();
    for line in text.trim_end().lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Violation;

    fn result(name: &str, success: bool, skipped: bool) -> HookResult {
        HookResult {
            name: name.into(),
            success,
            skipped,
            duration: Duration::from_millis(12),
            output: String::new(),
            error: (!success && !skipped).then(|| "exit code 1".to_string()),
        }
    }

    #[test]
    fn renders_pass_fail_and_summary() {
        console::set_colors_enabled(false);
        let results = vec![
            result("fmt", true, false),
            result("lint", false, false),
            result("slow", true, true),
        ];

        let text = render_results(&results, false);
        assert!(text.contains("[PASS] fmt (12ms)"));
        assert!(text.contains("[FAIL] lint (12ms)"));
        assert!(text.contains("Error: exit code 1"));
        // Skips are hidden unless verbose.
        assert!(!text.contains("[SKIP]"));
        assert!(text.contains("1 passed, 1 failed, 1 skipped"));

        let verbose = render_results(&results, true);
        assert!(verbose.contains("[SKIP] slow"));
    }

    #[test]
    fn renders_captured_output_indented_on_failure() {
        console::set_colors_enabled(false);
        let mut failing = result("lint", false, false);
        failing.output = "line one\nline two".into();

        let text = render_results(&[failing], false);
        assert!(text.contains("    line one\n    line two\n"));
    }

    #[test]
    fn renders_policy_verdicts() {
        console::set_colors_enabled(false);
        let passing = EvalResult {
            passed: true,
            violations: vec![],
        };
        assert!(render_policy(&passing).contains("[PASS] policies"));

        let failing = EvalResult {
            passed: false,
            violations: vec![Violation {
                rule: "max_files_changed".into(),
                message: "too many files: 3 (max: 2)".into(),
            }],
        };
        let text = render_policy(&failing);
        assert!(text.contains("[FAIL] policies"));
        assert!(text.contains("[max_files_changed] too many files"));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
