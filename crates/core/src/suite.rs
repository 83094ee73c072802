//! Suites: ordered collections of scenarios loaded from a directory

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::context::RunContext;
use crate::errors::ParseError;
use crate::runner::ScenarioResult;
use crate::scenario::Scenario;

/// An ordered collection of scenarios parsed from the YAML files in a
/// directory.
pub struct Suite {
    pub path: PathBuf,
    pub name: String,
    scenarios: Vec<Scenario>,
}

/// The scenario files (`*.yaml` / `*.yml`) under a directory, in sorted
/// path order. Errors from the walk itself abort; what the files contain
/// is the caller's concern.
pub fn scenario_files(dir: &Path) -> Result<Vec<PathBuf>, ParseError> {
    if !dir.exists() {
        return Err(ParseError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| ParseError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_yaml = entry
            .path()
            .extension()
            .map(|ext| ext == "yaml" || ext == "yml")
            .unwrap_or(false);
        if is_yaml {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}

impl Suite {
    /// Load every `*.yaml` / `*.yml` file under the directory, in sorted
    /// path order.
    pub fn from_dir(dir: &Path) -> Result<Self, ParseError> {
        let paths = scenario_files(dir)?;

        let mut scenarios = Vec::with_capacity(paths.len());
        for path in &paths {
            scenarios.push(Scenario::from_file(path)?);
        }

        Ok(Self {
            path: dir.to_path_buf(),
            name: dir
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            scenarios,
        })
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Run every scenario in order. A scenario's runtime error aborts that
    /// scenario only; its siblings still run.
    pub async fn run(&self, ctx: &RunContext) -> SuiteResult {
        let mut result = SuiteResult::default();
        for scenario in &self.scenarios {
            result.total += 1;
            match scenario.run(ctx).await {
                Ok(r) if r.skipped => {
                    info!(scenario = %r.name, "scenario skipped");
                    result.skipped += 1;
                    result.scenarios.push(SuiteScenario::from_result(r));
                }
                Ok(r) => {
                    if r.passed() {
                        result.passed += 1;
                    } else {
                        result.failed += 1;
                    }
                    result.scenarios.push(SuiteScenario::from_result(r));
                }
                Err(e) => {
                    error!(scenario = %scenario.title(), error = %e, "scenario aborted");
                    result.errors += 1;
                    result.scenarios.push(SuiteScenario {
                        name: scenario.title(),
                        error: Some(e.to_string()),
                        result: None,
                    });
                }
            }
        }
        result
    }
}

/// Aggregate outcome of a suite run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub scenarios: Vec<SuiteScenario>,
}

impl SuiteResult {
    pub fn passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// One scenario's entry in a suite result: either an outcome or a runtime
/// error.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteScenario {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScenarioResult>,
}

impl SuiteScenario {
    fn from_result(result: ScenarioResult) -> Self {
        Self {
            name: result.name.clone(),
            error: None,
            result: Some(result),
        }
    }
}
