//! Fixture lifecycle and state lookup
//!
//! Fixtures are externally-supplied capability objects a scenario depends
//! on: started before any spec runs, stopped (best-effort, reverse order)
//! when the scenario finishes on any path. Plugins may look up keyed state
//! from a fixture during evaluation; the runner itself never does.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::RunContext;
use crate::errors::RuntimeError;

/// A named external dependency with a start/stop lifecycle and a keyed
/// state map. State keys are case-insensitive.
#[async_trait]
pub trait Fixture: Send + Sync {
    /// Set up the fixture. An error aborts the scenario before any spec
    /// runs.
    async fn start(&self, ctx: &RunContext) -> Result<(), RuntimeError>;

    /// Tear down the fixture. Best-effort: cannot fail the scenario.
    async fn stop(&self, ctx: &RunContext);

    /// True if the fixture holds state under the given key.
    fn has_state(&self, _key: &str) -> bool {
        false
    }

    /// State data at the given key, if any.
    fn state(&self, _key: &str) -> Option<Value> {
        None
    }
}

type StartFn = Box<dyn Fn() -> Result<(), RuntimeError> + Send + Sync>;
type StopFn = Box<dyn Fn() + Send + Sync>;

/// Adapts plain closures and a state map into a [`Fixture`].
#[derive(Default)]
pub struct GenericFixture {
    starter: Option<StartFn>,
    stopper: Option<StopFn>,
    state: HashMap<String, Value>,
}

impl GenericFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_starter(
        mut self,
        starter: impl Fn() -> Result<(), RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.starter = Some(Box::new(starter));
        self
    }

    pub fn with_stopper(mut self, stopper: impl Fn() + Send + Sync + 'static) -> Self {
        self.stopper = Some(Box::new(stopper));
        self
    }

    pub fn with_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state.insert(key.into().to_lowercase(), value);
        self
    }
}

#[async_trait]
impl Fixture for GenericFixture {
    async fn start(&self, _ctx: &RunContext) -> Result<(), RuntimeError> {
        match &self.starter {
            Some(starter) => starter(),
            None => Ok(()),
        }
    }

    async fn stop(&self, _ctx: &RunContext) {
        if let Some(stopper) = &self.stopper {
            stopper();
        }
    }

    fn has_state(&self, key: &str) -> bool {
        self.state.contains_key(&key.to_lowercase())
    }

    fn state(&self, key: &str) -> Option<Value> {
        self.state.get(&key.to_lowercase()).cloned()
    }
}
