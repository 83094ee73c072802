//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;

use specrun_core::runner::ScenarioResult;
use specrun_core::suite::SuiteResult;

use crate::xunit;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable per-spec lines
    #[default]
    Human,
    /// JSON format
    Json,
    /// JUnit-style XML report
    Xunit,
}

/// Print one scenario's outcome.
pub fn print_scenario(result: &ScenarioResult, format: OutputFormat) {
    match format {
        OutputFormat::Human => print_scenario_human(result),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(result).unwrap_or_default()
            );
        }
        OutputFormat::Xunit => {
            let results = xunit::XUnitResults::new(vec![xunit::from_scenario(result)]);
            println!("{}", results.to_xml());
        }
    }
}

/// Print a suite's aggregate outcome.
pub fn print_suite(result: &SuiteResult, format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            for scenario in &result.scenarios {
                if let Some(error) = &scenario.error {
                    println!("=== {}", scenario.name.bold());
                    println!("--- {}: {}", "ERROR".red().bold(), error);
                    continue;
                }
                if let Some(r) = &scenario.result {
                    print_scenario_human(r);
                }
            }
            println!();
            let summary = format!(
                "{} scenarios: {} passed, {} failed, {} skipped, {} errors",
                result.total, result.passed, result.failed, result.skipped, result.errors
            );
            if result.passed() {
                println!("{}", summary.green());
            } else {
                println!("{}", summary.red());
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(result).unwrap_or_default()
            );
        }
        OutputFormat::Xunit => {
            let results = xunit::XUnitResults::new(xunit::from_suite(result));
            println!("{}", results.to_xml());
        }
    }
}

/// Print a scenario that aborted with a runtime error.
pub fn print_scenario_error(name: &str, error: &dyn std::fmt::Display, format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            println!("=== {}", name.bold());
            println!("--- {}: {}", "ERROR".red().bold(), error);
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "name": name,
                "error": error.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        }
        OutputFormat::Xunit => {
            let results = xunit::XUnitResults::new(vec![xunit::error_suite(name, error)]);
            println!("{}", results.to_xml());
        }
    }
}

fn print_scenario_human(result: &ScenarioResult) {
    println!("=== {}", result.name.bold());
    if result.skipped {
        println!("--- {}: {}", "SKIP".yellow().bold(), result.name);
        return;
    }
    for spec in &result.specs {
        if spec.passed() {
            println!(
                "--- {}: {} ({} ms)",
                "PASS".green().bold(),
                spec.title,
                spec.duration_ms
            );
        } else {
            println!(
                "--- {}: {} ({} ms)",
                "FAIL".red().bold(),
                spec.title,
                spec.duration_ms
            );
            for failure in &spec.failures {
                println!("    {}", failure);
            }
        }
    }
}
