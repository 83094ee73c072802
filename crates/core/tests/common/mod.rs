//! Stub plugins and fixtures for driving the engine in tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::json;
use serde_yaml::Mapping;

use specrun_core::context::RunContext;
use specrun_core::errors::{Failure, ParseError, RuntimeError};
use specrun_core::node;
use specrun_core::plugin::{Evaluable, Plugin, PluginDefaults, PluginInfo, SpecParser};
use specrun_core::registry;
use specrun_core::result::SpecResult;
use specrun_core::spec::{SpecBase, BASE_FIELDS};
use specrun_core::timing::RetryPolicy;

/// Evaluation counters, keyed by the `sim` spec's key. Tests use unique
/// keys so parallel tests never interfere.
static COUNTS: Lazy<Mutex<HashMap<String, u32>>> = Lazy::new(|| Mutex::new(HashMap::new()));

pub fn eval_count(key: &str) -> u32 {
    COUNTS.lock().get(key).copied().unwrap_or(0)
}

fn bump(key: &str) -> u32 {
    let mut counts = COUNTS.lock();
    let count = counts.entry(key.to_string()).or_insert(0);
    *count += 1;
    *count
}

pub fn register_stub_plugins() {
    registry::register(Arc::new(SimPlugin));
    registry::register(Arc::new(PriorPlugin));
}

/// A plugin whose specs simulate configurable pass/fail behaviour:
///
/// ```yaml
/// - sim: unique-counter-key
///   pass-on-attempt: 3     # 0 = never pass; absent = always pass
///   sleep-ms: 100
///   runtime-error: true
///   no-retry: true         # evaluable-level retry override
/// ```
pub struct SimPlugin;

impl Plugin for SimPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: "sim".to_string(),
            description: "simulated outcomes for engine tests".to_string(),
            ..PluginInfo::default()
        }
    }

    fn parse_defaults(&self, _doc: &Mapping) -> Result<PluginDefaults, ParseError> {
        Ok(Arc::new(()))
    }

    fn specs(&self) -> Vec<Box<dyn SpecParser>> {
        vec![Box::new(SimSpecParser)]
    }
}

struct SimSpecParser;

impl SpecParser for SimSpecParser {
    fn detect(&self, m: &Mapping) -> bool {
        node::has_key(m, "sim")
    }

    fn parse(&self, m: &Mapping, at: &str) -> Result<Box<dyn Evaluable>, ParseError> {
        let mut spec = SimSpec::default();
        for (k, v) in m {
            let key = node::key_str(k).ok_or_else(|| ParseError::ExpectedScalar {
                at: at.to_string(),
            })?;
            match key {
                "sim" => {
                    spec.key = node::scalar_str(v).ok_or_else(|| ParseError::ExpectedScalar {
                        at: node::child(at, key),
                    })?;
                }
                "pass-on-attempt" => {
                    spec.pass_on_attempt =
                        Some(node::scalar_i64(v).ok_or_else(|| ParseError::ExpectedInt {
                            at: node::child(at, key),
                        })? as u32);
                }
                "sleep-ms" => {
                    spec.sleep_ms = node::scalar_i64(v).ok_or_else(|| ParseError::ExpectedInt {
                        at: node::child(at, key),
                    })? as u64;
                }
                "runtime-error" => {
                    spec.runtime_error =
                        node::scalar_bool(v).ok_or_else(|| ParseError::ExpectedScalar {
                            at: node::child(at, key),
                        })?;
                }
                "no-retry" => {
                    spec.no_retry =
                        node::scalar_bool(v).ok_or_else(|| ParseError::ExpectedScalar {
                            at: node::child(at, key),
                        })?;
                }
                _ => {
                    if BASE_FIELDS.contains(&key) {
                        continue;
                    }
                    return Err(ParseError::UnknownField {
                        at: at.to_string(),
                        field: key.to_string(),
                    });
                }
            }
        }
        Ok(Box::new(spec))
    }
}

#[derive(Default)]
pub struct SimSpec {
    base: SpecBase,
    key: String,
    pass_on_attempt: Option<u32>,
    sleep_ms: u64,
    runtime_error: bool,
    no_retry: bool,
}

#[async_trait]
impl Evaluable for SimSpec {
    async fn eval(&self, _ctx: &RunContext) -> Result<SpecResult, RuntimeError> {
        if self.sleep_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.sleep_ms)).await;
        }
        let attempt = bump(&self.key);
        if self.runtime_error {
            return Err(RuntimeError::Eval(format!("sim {}: simulated", self.key)));
        }
        let pass = match self.pass_on_attempt {
            None => true,
            Some(0) => false,
            Some(n) => attempt >= n,
        };
        if pass {
            Ok(SpecResult::new())
        } else {
            Ok(SpecResult::with_failure(Failure::UnexpectedError(format!(
                "sim {}: attempt {} failing",
                self.key, attempt
            ))))
        }
    }

    fn set_base(&mut self, base: SpecBase) {
        self.base = base;
    }

    fn base(&self) -> &SpecBase {
        &self.base
    }

    fn retry(&self) -> Option<RetryPolicy> {
        if self.no_retry {
            Some(RetryPolicy::Disabled)
        } else {
            None
        }
    }
}

/// A plugin exercising prior-run data threading:
///
/// ```yaml
/// - prior-state: value-saved-for-later-specs
///   prior-expect: value-expected-from-the-previous-spec
/// ```
pub struct PriorPlugin;

pub const PRIOR_RUN_KEY: &str = "prior";

impl Plugin for PriorPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: "priorRun".to_string(),
            ..PluginInfo::default()
        }
    }

    fn parse_defaults(&self, _doc: &Mapping) -> Result<PluginDefaults, ParseError> {
        Ok(Arc::new(()))
    }

    fn specs(&self) -> Vec<Box<dyn SpecParser>> {
        vec![Box::new(PriorSpecParser)]
    }
}

struct PriorSpecParser;

impl SpecParser for PriorSpecParser {
    fn detect(&self, m: &Mapping) -> bool {
        node::has_key(m, "prior-state")
    }

    fn parse(&self, m: &Mapping, at: &str) -> Result<Box<dyn Evaluable>, ParseError> {
        let mut spec = PriorSpec::default();
        for (k, v) in m {
            let key = node::key_str(k).ok_or_else(|| ParseError::ExpectedScalar {
                at: at.to_string(),
            })?;
            match key {
                "prior-state" => {
                    spec.state = node::scalar_str(v).ok_or_else(|| ParseError::ExpectedScalar {
                        at: node::child(at, key),
                    })?;
                }
                "prior-expect" => {
                    spec.expect = node::scalar_str(v);
                }
                _ => {
                    if BASE_FIELDS.contains(&key) {
                        continue;
                    }
                    return Err(ParseError::UnknownField {
                        at: at.to_string(),
                        field: key.to_string(),
                    });
                }
            }
        }
        Ok(Box::new(spec))
    }
}

#[derive(Default)]
pub struct PriorSpec {
    base: SpecBase,
    state: String,
    expect: Option<String>,
}

#[async_trait]
impl Evaluable for PriorSpec {
    async fn eval(&self, ctx: &RunContext) -> Result<SpecResult, RuntimeError> {
        let mut result = SpecResult::new();
        if let Some(expect) = &self.expect {
            match ctx.prior_run().get(PRIOR_RUN_KEY) {
                Some(serde_json::Value::String(s)) if s == expect => {}
                other => result.add_failure(Failure::UnexpectedError(format!(
                    "expected prior-run {:?} but got {:?}",
                    expect, other
                ))),
            }
        } else if !ctx.prior_run().contains_key(PRIOR_RUN_KEY) && self.base.index > 0 {
            result.add_failure(Failure::UnexpectedError(
                "expected prior-run data from an earlier spec".to_string(),
            ));
        }
        result.set_data(PRIOR_RUN_KEY, json!(self.state));
        Ok(result)
    }

    fn set_base(&mut self, base: SpecBase) {
        self.base = base;
    }

    fn base(&self) -> &SpecBase {
        &self.base
    }
}

/// A fixture that records lifecycle events into a shared log.
pub struct RecorderFixture {
    pub name: String,
    pub log: Arc<Mutex<Vec<String>>>,
    pub fail_start: bool,
}

impl RecorderFixture {
    pub fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            log,
            fail_start: false,
        }
    }

    pub fn failing(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            log,
            fail_start: true,
        }
    }
}

#[async_trait]
impl specrun_core::fixture::Fixture for RecorderFixture {
    async fn start(&self, _ctx: &RunContext) -> Result<(), RuntimeError> {
        self.log.lock().push(format!("start:{}", self.name));
        if self.fail_start {
            return Err(RuntimeError::Fixture {
                name: self.name.clone(),
                msg: "refusing to start".to_string(),
            });
        }
        Ok(())
    }

    async fn stop(&self, _ctx: &RunContext) {
        self.log.lock().push(format!("stop:{}", self.name));
    }
}
