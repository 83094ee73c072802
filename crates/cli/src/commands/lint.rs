//! Lint Command

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use specrun_core::errors::ParseError;
use specrun_core::suite::scenario_files;
use specrun_core::Scenario;

#[derive(Args)]
pub struct LintArgs {
    /// Scenario files or suite directories to check
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

pub fn execute(args: LintArgs) -> Result<i32> {
    let mut ok = true;
    for path in &args.paths {
        if path.is_dir() {
            // Every file gets its own verdict: a parse error in one
            // scenario must not hide problems in its siblings.
            for file in scenario_files(path)? {
                ok &= lint_file(&file)?;
            }
        } else {
            ok &= lint_file(path)?;
        }
    }
    Ok(if ok { 0 } else { 1 })
}

fn lint_file(path: &Path) -> Result<bool> {
    match Scenario::from_file(path) {
        Ok(_) => {
            println!("{} {}", "ok".green(), path.display());
            Ok(true)
        }
        // Failing to read the file at all aborts the lint; a scenario
        // that does not parse is just this file's finding.
        Err(e @ ParseError::Io(_)) => Err(e.into()),
        Err(e) => {
            println!("{} {}: {}", "error".red(), path.display(), e);
            Ok(false)
        }
    }
}
