//! Scenario parsing
//!
//! A scenario is one YAML document describing an ordered list of specs.
//! Parsing makes two passes over the top-level mapping: the first collects
//! the common fields and hands the raw `defaults` mapping to every
//! registered plugin; the second dispatches each `tests` and `skip-if`
//! node to the plugin whose spec shape it matches.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use crate::errors::ParseError;
use crate::expand::expand_env;
use crate::node;
use crate::plugin::{Evaluable, Plugin, PluginDefaults};
use crate::registry;
use crate::spec::{self, SpecBase};
use crate::timing::{RetryPolicy, SetOn, Timeout, Timings};

/// Reserved key within [`Defaults`] for the scenario's own defaults.
pub const SCENARIO_DEFAULTS_KEY: &str = "scenario";

/// Parsed defaults, keyed by plugin name plus the reserved scenario key.
#[derive(Clone, Default)]
pub struct Defaults {
    entries: HashMap<String, PluginDefaults>,
}

impl std::fmt::Debug for Defaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Defaults")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Defaults {
    pub fn insert(&mut self, key: impl Into<String>, value: PluginDefaults) {
        self.entries.insert(key.into().to_lowercase(), value);
    }

    /// The defaults object a plugin parsed, if any.
    pub fn for_plugin(&self, name: &str) -> Option<PluginDefaults> {
        self.entries.get(&name.to_lowercase()).cloned()
    }

    /// The scenario-level defaults, if the scenario declared any.
    pub fn scenario(&self) -> Option<Arc<ScenarioDefaults>> {
        self.entries
            .get(SCENARIO_DEFAULTS_KEY)?
            .clone()
            .downcast::<ScenarioDefaults>()
            .ok()
    }
}

/// Scenario-level default timeout and retry, applied to specs that carry
/// no override of their own.
#[derive(Debug, Clone, Default)]
pub struct ScenarioDefaults {
    pub timeout: Option<Timeout>,
    pub retry: Option<RetryPolicy>,
}

impl ScenarioDefaults {
    fn from_node(m: &Mapping, at: &str) -> Result<Self, ParseError> {
        let mut defaults = ScenarioDefaults::default();
        for (k, v) in m {
            let key = match node::key_str(k) {
                Some(k) => k,
                None => return Err(ParseError::ExpectedScalar { at: at.to_string() }),
            };
            match key {
                "timeout" => {
                    defaults.timeout = Some(spec::parse_timeout_node(v, &node::child(at, key))?);
                }
                "retry" => {
                    defaults.retry = Some(RetryPolicy::Config(spec::parse_retry_node(
                        v,
                        &node::child(at, key),
                    )?));
                }
                _ => {} // plugin sections
            }
        }
        Ok(defaults)
    }
}

/// An ordered list of specs loaded from one YAML document. Immutable after
/// parse; consumed by the runner.
#[derive(Default)]
pub struct Scenario {
    /// Filepath the scenario was loaded from, when known.
    pub path: PathBuf,
    /// Short name. Defaults to the base filename when loaded from a file.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Ordered names of fixtures the scenario depends on.
    pub fixtures: Vec<String>,
    defaults: Defaults,
    pub(crate) skip_if: Vec<Arc<dyn Evaluable>>,
    pub(crate) tests: Vec<Arc<dyn Evaluable>>,
    timings: Timings,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("fixtures", &self.fixtures)
            .field("skip_if_count", &self.skip_if.len())
            .field("tests_count", &self.tests.len())
            .field("timings", &self.timings)
            .finish()
    }
}

impl Scenario {
    /// Parse a scenario from YAML text, expanding environment variables
    /// first.
    pub fn from_yaml(yaml: &str) -> Result<Self, ParseError> {
        let plugins = registry::registered();
        Self::parse(yaml, &plugins)
    }

    /// Parse a scenario from a reader.
    pub fn from_reader(mut r: impl Read) -> Result<Self, ParseError> {
        let mut contents = String::new();
        r.read_to_string(&mut contents)?;
        Self::from_yaml(&contents)
    }

    /// Parse a scenario from a YAML file. Errors are annotated with the
    /// file path; the scenario's name defaults to the file's base name.
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        if !path.exists() {
            return Err(ParseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(ParseError::from)?;
        let mut scenario = Self::from_yaml(&contents).map_err(|e| e.in_file(path))?;
        scenario.path = path.to_path_buf();
        Ok(scenario)
    }

    /// The scenario's display title: its name, or the base name of the
    /// file it was loaded from.
    pub fn title(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn tests(&self) -> &[Arc<dyn Evaluable>] {
        &self.tests
    }

    pub fn skip_if(&self) -> &[Arc<dyn Evaluable>] {
        &self.skip_if
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub(crate) fn scenario_defaults(&self) -> Option<Arc<ScenarioDefaults>> {
        self.defaults.scenario()
    }

    fn parse(yaml: &str, plugins: &[Arc<dyn Plugin>]) -> Result<Self, ParseError> {
        let expanded = expand_env(yaml);
        let doc: Value = serde_yaml::from_str(&expanded)?;
        let root = doc
            .as_mapping()
            .ok_or_else(|| ParseError::ExpectedMap { at: "document".to_string() })?;

        let mut scenario = Scenario::default();

        // First pass: common fields and defaults. The parsed defaults are
        // needed before any test node can be materialized.
        for (k, v) in root {
            let key = match node::key_str(k) {
                Some(k) => k,
                None => {
                    return Err(ParseError::ExpectedScalar { at: "document".to_string() });
                }
            };
            match key {
                "name" => {
                    scenario.name = node::scalar_str(v).ok_or(ParseError::ExpectedScalar {
                        at: "name".to_string(),
                    })?;
                }
                "description" => {
                    scenario.description =
                        node::scalar_str(v).ok_or(ParseError::ExpectedScalar {
                            at: "description".to_string(),
                        })?;
                }
                "fixtures" => {
                    let seq = v.as_sequence().ok_or(ParseError::ExpectedSequence {
                        at: "fixtures".to_string(),
                    })?;
                    for (i, item) in seq.iter().enumerate() {
                        let name =
                            node::scalar_str(item).ok_or_else(|| ParseError::ExpectedScalar {
                                at: node::elem("fixtures", i),
                            })?;
                        scenario.fixtures.push(name);
                    }
                }
                "defaults" => {
                    let m = v.as_mapping().ok_or(ParseError::ExpectedMap {
                        at: "defaults".to_string(),
                    })?;
                    for plugin in plugins {
                        let parsed = plugin.parse_defaults(m)?;
                        scenario.defaults.insert(plugin.info().name, parsed);
                    }
                    let scen = ScenarioDefaults::from_node(m, "defaults")?;
                    scenario
                        .defaults
                        .insert(SCENARIO_DEFAULTS_KEY, Arc::new(scen));
                }
                _ => {}
            }
        }

        // Second pass: materialize the plugin-specific test units.
        for (k, v) in root {
            let key = match node::key_str(k) {
                Some(k) => k,
                None => continue,
            };
            match key {
                "tests" => {
                    scenario.tests = parse_specs(v, "tests", plugins, &scenario.defaults)?;
                }
                "skip-if" => {
                    scenario.skip_if = parse_specs(v, "skip-if", plugins, &scenario.defaults)?;
                }
                _ => {}
            }
        }

        scenario.timings = compute_timings(&scenario, plugins);
        Ok(scenario)
    }
}

/// Parse a sequence of spec nodes, binding each to exactly one plugin.
fn parse_specs(
    v: &Value,
    at: &str,
    plugins: &[Arc<dyn Plugin>],
    defaults: &Defaults,
) -> Result<Vec<Arc<dyn Evaluable>>, ParseError> {
    let seq = v
        .as_sequence()
        .ok_or_else(|| ParseError::ExpectedSequence { at: at.to_string() })?;

    let mut specs: Vec<Arc<dyn Evaluable>> = Vec::with_capacity(seq.len());
    for (index, item) in seq.iter().enumerate() {
        let item_at = node::elem(at, index);
        let m = item
            .as_mapping()
            .ok_or_else(|| ParseError::ExpectedMap { at: item_at.clone() })?;

        let mut base = SpecBase::from_node(m, &item_at)?;
        base.index = index;
        base.defaults = defaults.clone();

        let mut parsed = None;
        'plugins: for plugin in plugins {
            for sp in plugin.specs() {
                if sp.detect(m) {
                    let mut evaluable = sp.parse(m, &item_at)?;
                    base.plugin = plugin.info().name;
                    evaluable.set_base(base);
                    parsed = Some(evaluable);
                    break 'plugins;
                }
            }
        }
        match parsed {
            Some(evaluable) => specs.push(Arc::from(evaluable)),
            None => return Err(ParseError::UnknownSpec { at: item_at }),
        }
    }
    Ok(specs)
}

/// Aggregate wait and timeout durations across the scenario's specs, using
/// the parse-time portion of the precedence chain (spec base, scenario
/// default, plugin default).
fn compute_timings(scenario: &Scenario, plugins: &[Arc<dyn Plugin>]) -> Timings {
    let scen_defaults = scenario.scenario_defaults();
    let mut timings = Timings::default();

    for spec in &scenario.tests {
        let base = spec.base();
        if let Some(wait) = &base.wait {
            timings.add_wait(wait.total());
        }

        let (timeout, set_on) = if let Some(to) = &base.timeout {
            (Some(to.clone()), SetOn::Spec)
        } else if let Some(to) = scen_defaults.as_ref().and_then(|d| d.timeout.clone()) {
            (Some(to), SetOn::ScenarioDefault)
        } else {
            let lowered = base.plugin.to_lowercase();
            let plugin_timeout = plugins
                .iter()
                .find(|p| p.info().name.to_lowercase() == lowered)
                .and_then(|p| p.info().timeout);
            (plugin_timeout, SetOn::PluginDefault)
        };
        if let Some(to) = timeout {
            timings.add_timeout(to.after, set_on, base.index);
        }
    }
    timings
}
