//! Execution context threaded through scenario runs
//!
//! A [`RunContext`] is an immutable value: every mutation clones, so scoped
//! changes (a pushed trace token, merged prior-run data) never leak into
//! sibling specs. Cloning is cheap; the heavyweight members are behind
//! `Arc`s.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::fixture::Fixture;
use crate::plugin::Plugin;
use crate::registry;

/// A writable destination for debug output.
pub type DebugSink = Arc<Mutex<Box<dyn Write + Send>>>;

const TRACE_DELIMITER: &str = "/";

/// Immutable handle carrying everything a scenario run needs: the plugins
/// known at construction, named fixtures, prior-run data, debug sinks, and
/// the trace breadcrumb.
#[derive(Clone, Default)]
pub struct RunContext {
    plugins: Vec<Arc<dyn Plugin>>,
    fixtures: HashMap<String, Arc<dyn Fixture>>,
    prior_run: HashMap<String, Value>,
    debug_sinks: Vec<DebugSink>,
    trace: Vec<String>,
    budget: Option<Duration>,
}

impl RunContext {
    /// A context seeded with the process-wide plugin registry.
    pub fn new() -> Self {
        Self {
            plugins: registry::registered(),
            ..Self::default()
        }
    }

    /// Replace the context's plugins.
    pub fn with_plugins(mut self, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Register a named fixture. Names are case-insensitive.
    pub fn with_fixture(mut self, name: impl Into<String>, fixture: Arc<dyn Fixture>) -> Self {
        self.fixtures.insert(name.into().to_lowercase(), fixture);
        self
    }

    /// Add a debug output sink.
    pub fn with_debug(mut self, sink: impl Write + Send + 'static) -> Self {
        self.debug_sinks.push(Arc::new(Mutex::new(Box::new(sink))));
        self
    }

    /// Set the host harness's overall time budget. Scenarios whose waits or
    /// timeouts cannot fit inside it fail before starting.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Look up a plugin by name, case-insensitively.
    pub fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        let lowered = name.to_lowercase();
        self.plugins
            .iter()
            .find(|p| p.info().name.to_lowercase() == lowered)
            .cloned()
    }

    /// Look up a fixture by name, case-insensitively.
    pub fn fixture(&self, name: &str) -> Option<Arc<dyn Fixture>> {
        self.fixtures.get(&name.to_lowercase()).cloned()
    }

    pub fn prior_run(&self) -> &HashMap<String, Value> {
        &self.prior_run
    }

    /// A new context with the supplied run data merged into the prior-run
    /// cache. Colliding keys are overwritten.
    pub fn store_prior_run(&self, data: HashMap<String, Value>) -> Self {
        let mut next = self.clone();
        next.prior_run.extend(data);
        next
    }

    pub fn debug_sinks(&self) -> &[DebugSink] {
        &self.debug_sinks
    }

    /// A new context with a trace token pushed onto the breadcrumb stack.
    pub fn push_trace(&self, token: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.trace.push(token.into());
        next
    }

    /// A new context with the last trace token removed.
    pub fn pop_trace(&self) -> Self {
        let mut next = self.clone();
        next.trace.pop();
        next
    }

    /// The trace breadcrumb joined with `/`.
    pub fn trace(&self) -> String {
        self.trace.join(TRACE_DELIMITER)
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }
}
