//! Plugin and evaluable contracts
//!
//! A plugin teaches the parser how to recognize a family of spec shapes in
//! a scenario document and produces [`Evaluable`] values the runner drives.
//! Plugins register themselves with the process-wide registry; the registry
//! seeds every new scenario's parsing context.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_yaml::Mapping;

use crate::context::RunContext;
use crate::errors::{ParseError, RuntimeError};
use crate::result::SpecResult;
use crate::spec::SpecBase;
use crate::timing::{RetryPolicy, Timeout};

/// Opaque defaults object a plugin parsed from the scenario's `defaults`
/// mapping. Plugins downcast their own entry during evaluation.
pub type PluginDefaults = Arc<dyn Any + Send + Sync>;

/// Basic information about a plugin and the defaults it contributes to
/// retry/timeout resolution.
#[derive(Clone, Default)]
pub struct PluginInfo {
    /// Primary name, unique across the registry.
    pub name: String,
    /// Optional aliased names.
    pub aliases: Vec<String>,
    /// What kinds of specs the plugin handles.
    pub description: String,
    /// Default deadline for specs owned by this plugin.
    pub timeout: Option<Timeout>,
    /// Default retry behaviour for specs owned by this plugin.
    pub retry: Option<RetryPolicy>,
}

/// Driver interface for a family of spec shapes.
pub trait Plugin: Send + Sync {
    /// Describes the plugin.
    fn info(&self) -> PluginInfo;

    /// Parse the scenario's raw `defaults` mapping into this plugin's
    /// defaults object. The plugin picks out its own section and ignores
    /// the rest.
    fn parse_defaults(&self, doc: &Mapping) -> Result<PluginDefaults, ParseError>;

    /// The spec shapes this plugin knows how to parse.
    fn specs(&self) -> Vec<Box<dyn SpecParser>>;
}

/// One spec shape a plugin can materialize from a YAML mapping.
///
/// Dispatch is by detection: `detect` checks for the shape's
/// distinguishing fields (for example, an `exec` key), and only a detected
/// parser's `parse` runs. Parsing is strict; fields that are neither base
/// spec fields nor known to the shape are errors.
pub trait SpecParser: Send + Sync {
    /// True if the mapping contains this shape's distinguishing fields.
    fn detect(&self, node: &Mapping) -> bool;

    /// Parse the mapping into an evaluable. `at` is the node's path within
    /// the document, for error annotation.
    fn parse(&self, node: &Mapping, at: &str) -> Result<Box<dyn Evaluable>, ParseError>;
}

/// A single test unit the runner drives.
///
/// Evaluation must be idempotent with respect to external state between
/// calls: when a retry policy applies, the runner calls `eval` repeatedly.
#[async_trait]
pub trait Evaluable: Send + Sync {
    /// Perform the spec's action and evaluate its assertions. Assertion
    /// failures live inside the result; only unrecoverable conditions
    /// return an error.
    async fn eval(&self, ctx: &RunContext) -> Result<SpecResult, RuntimeError>;

    /// Attach the populated base spec. Called once during parse.
    fn set_base(&mut self, base: SpecBase);

    /// The spec's base fields.
    fn base(&self) -> &SpecBase;

    /// Per-spec retry override, consulted before any configured value.
    /// `Some(RetryPolicy::Disabled)` explicitly turns retries off.
    fn retry(&self) -> Option<RetryPolicy> {
        None
    }

    /// Per-spec timeout override, consulted before any configured value.
    fn timeout(&self) -> Option<Timeout> {
        None
    }
}
