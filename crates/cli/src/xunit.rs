//! XUnit (JUnit-style XML) test reports
//!
//! CI systems consume one `<testsuites>` document per run: a `<testsuite>`
//! per scenario, a `<testcase>` per spec, with `<failure>`, `<error>`, and
//! `<skipped>` children carrying the outcome.

use std::fmt::Write;

use specrun_core::runner::ScenarioResult;
use specrun_core::suite::SuiteResult;

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// A full run's report: the document root.
#[derive(Debug, Clone, Default)]
pub struct XUnitResults {
    pub test_suites: Vec<XUnitTestSuite>,
}

/// One scenario's outcomes.
#[derive(Debug, Clone, Default)]
pub struct XUnitTestSuite {
    pub name: String,
    pub tests: usize,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
    pub time_seconds: f64,
    pub cases: Vec<XUnitTestCase>,
}

/// One spec's outcome.
#[derive(Debug, Clone, Default)]
pub struct XUnitTestCase {
    pub name: String,
    pub time_seconds: f64,
    pub failures: Vec<String>,
    pub error: Option<String>,
    pub skipped: bool,
}

impl XUnitResults {
    pub fn new(test_suites: Vec<XUnitTestSuite>) -> Self {
        Self { test_suites }
    }

    /// Render the report as an XML document.
    pub fn to_xml(&self) -> String {
        let mut out = String::from(XML_HEADER);
        out.push_str("<testsuites>\n");
        for suite in &self.test_suites {
            let _ = writeln!(
                out,
                "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\" time=\"{:.3}\">",
                escape(&suite.name),
                suite.tests,
                suite.failures,
                suite.errors,
                suite.skipped,
                suite.time_seconds,
            );
            for case in &suite.cases {
                let open = format!(
                    "    <testcase name=\"{}\" time=\"{:.3}\"",
                    escape(&case.name),
                    case.time_seconds,
                );
                if case.failures.is_empty() && case.error.is_none() && !case.skipped {
                    out.push_str(&open);
                    out.push_str("/>\n");
                    continue;
                }
                out.push_str(&open);
                out.push_str(">\n");
                if case.skipped {
                    out.push_str("      <skipped/>\n");
                }
                if let Some(error) = &case.error {
                    let _ = writeln!(out, "      <error message=\"{}\"/>", escape(error));
                }
                for failure in &case.failures {
                    let _ = writeln!(out, "      <failure message=\"{}\"/>", escape(failure));
                }
                out.push_str("    </testcase>\n");
            }
            out.push_str("  </testsuite>\n");
        }
        out.push_str("</testsuites>");
        out
    }
}

/// Build a test suite from one scenario's result.
pub fn from_scenario(result: &ScenarioResult) -> XUnitTestSuite {
    if result.skipped {
        return XUnitTestSuite {
            name: result.name.clone(),
            tests: 1,
            skipped: 1,
            cases: vec![XUnitTestCase {
                name: result.name.clone(),
                skipped: true,
                ..XUnitTestCase::default()
            }],
            ..XUnitTestSuite::default()
        };
    }
    let cases: Vec<XUnitTestCase> = result
        .specs
        .iter()
        .map(|spec| XUnitTestCase {
            name: spec.title.clone(),
            time_seconds: spec.duration_ms as f64 / 1000.0,
            failures: spec.failures.clone(),
            ..XUnitTestCase::default()
        })
        .collect();
    XUnitTestSuite {
        name: result.name.clone(),
        tests: cases.len(),
        failures: cases.iter().filter(|c| !c.failures.is_empty()).count(),
        time_seconds: cases.iter().map(|c| c.time_seconds).sum(),
        cases,
        ..XUnitTestSuite::default()
    }
}

/// Build a test suite for a scenario that aborted with a runtime error.
pub fn error_suite(name: &str, error: &dyn std::fmt::Display) -> XUnitTestSuite {
    XUnitTestSuite {
        name: name.to_string(),
        tests: 1,
        errors: 1,
        cases: vec![XUnitTestCase {
            name: name.to_string(),
            error: Some(error.to_string()),
            ..XUnitTestCase::default()
        }],
        ..XUnitTestSuite::default()
    }
}

/// Build the test suites for a whole suite run.
pub fn from_suite(result: &SuiteResult) -> Vec<XUnitTestSuite> {
    result
        .scenarios
        .iter()
        .map(|scenario| match (&scenario.error, &scenario.result) {
            (Some(error), _) => error_suite(&scenario.name, error),
            (None, Some(r)) => from_scenario(r),
            (None, None) => XUnitTestSuite {
                name: scenario.name.clone(),
                ..XUnitTestSuite::default()
            },
        })
        .collect()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
