//! Error types for scenario parsing and execution
//!
//! Three disjoint categories:
//!
//! - [`ParseError`]: the YAML document is malformed or violates the schema.
//!   Fatal at load time.
//! - [`Failure`]: an assertion over the system under test did not hold.
//!   Collected in a spec's result and reported, never fatal to the scenario.
//! - [`RuntimeError`]: an unrecoverable condition during execution. Aborts
//!   the scenario it occurred in.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a scenario document.
///
/// Schema errors carry the path of the offending node within the document
/// (e.g. `tests[2].timeout`); errors surfaced from a file loader are wrapped
/// with the source file path. Document-level syntax errors come from
/// `serde_yaml` and carry line/column information.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid YAML: expected map field at {at}")]
    ExpectedMap { at: String },

    #[error("invalid YAML: expected scalar field at {at}")]
    ExpectedScalar { at: String },

    #[error("invalid YAML: expected sequence field at {at}")]
    ExpectedSequence { at: String },

    #[error("invalid YAML: expected int value at {at}")]
    ExpectedInt { at: String },

    #[error("invalid YAML: expected scalar or map field at {at}")]
    ExpectedScalarOrMap { at: String },

    #[error("invalid YAML: expected scalar or sequence of scalars field at {at}")]
    ExpectedScalarOrSequence { at: String },

    #[error("invalid YAML: expected timeout specification at {at}")]
    ExpectedTimeout { at: String },

    #[error("invalid YAML: expected wait specification at {at}")]
    ExpectedWait { at: String },

    #[error("invalid YAML: expected retry specification at {at}")]
    ExpectedRetry { at: String },

    #[error("invalid YAML: invalid retry attempts of {attempts} at {at}")]
    InvalidRetryAttempts { at: String, attempts: i64 },

    #[error("invalid YAML: invalid duration {value:?} at {at}")]
    InvalidDuration { at: String, value: String },

    #[error("unknown field {field:?} at {at}")]
    UnknownField { at: String, field: String },

    #[error("no plugin could parse spec definition at {at}")]
    UnknownSpec { at: String },

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("{msg} at {at}")]
    Invalid { at: String, msg: String },

    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ParseError>,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Wrap this error with the source file it was encountered in.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        ParseError::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

/// A failed assertion about the system under test.
///
/// Failures are carried inside a spec's result, reported per spec, and do
/// not stop the scenario from running its remaining specs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    #[error("assertion failed: not equal: expected {expected} but got {got}")]
    NotEqual { expected: String, got: String },

    #[error("assertion failed: not in: expected {container} to contain {element}")]
    NotIn { element: String, container: String },

    #[error("assertion failed: in: expected {container} to not contain {element}")]
    In { element: String, container: String },

    #[error("assertion failed: none in: expected {container} to contain one of {elements:?}")]
    NoneIn {
        elements: Vec<String>,
        container: String,
    },

    #[error("assertion failed: timeout exceeded ({after})")]
    TimeoutExceeded { after: String },

    #[error("assertion failed: unexpected error: {0}")]
    UnexpectedError(String),
}

/// An unrecoverable condition during scenario execution.
///
/// Runtime errors abort the scenario they occur in; sibling scenarios in a
/// suite are unaffected.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("runtime error: required fixture missing: {0}")]
    RequiredFixtureMissing(String),

    #[error("runtime error: timeout conflict: scenario requires {required} but the harness budget is {budget}")]
    TimeoutConflict { required: String, budget: String },

    #[error("runtime error: fixture {name}: {msg}")]
    Fixture { name: String, msg: String },

    #[error("runtime error: {0}")]
    Eval(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
