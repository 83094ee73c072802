//! Per-spec evaluation results
//!
//! A [`SpecResult`] is returned from `Evaluable::eval` and serves two
//! purposes: carrying assertion failures (which are not runtime errors),
//! and passing back data to be injected into the prior-run cache that the
//! next spec's evaluation sees.

use std::collections::HashMap;

use serde_json::Value;

use crate::errors::Failure;

/// Outcome of evaluating a single spec.
#[derive(Debug, Default)]
pub struct SpecResult {
    /// Assertion failures raised during evaluation. Empty means success.
    failures: Vec<Failure>,
    /// Data about the run, keyed by plugin-chosen names. Merged into the
    /// scenario's prior-run cache and visible to later specs.
    data: HashMap<String, Value>,
}

impl SpecResult {
    /// A passing result with no run data.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failures(failures: Vec<Failure>) -> Self {
        Self {
            failures,
            data: HashMap::new(),
        }
    }

    pub fn with_failure(failure: Failure) -> Self {
        Self::with_failures(vec![failure])
    }

    /// True if any assertion failed during evaluation.
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn add_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    /// True if any run data has been set.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }

    /// Set a value in the result's run data. Collisions overwrite.
    pub fn set_data(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Move the run data out of the result.
    pub fn take_data(&mut self) -> HashMap<String, Value> {
        std::mem::take(&mut self.data)
    }
}
