//! Base spec fields shared by every plugin's spec shape
//!
//! Every spec node, regardless of owning plugin, accepts `name`,
//! `description`, `timeout`, `wait`, and `retry`. Plugins skip these when
//! rejecting unknown fields in their own parsers.

use serde_yaml::{Mapping, Value};

use crate::duration::parse_duration;
use crate::errors::ParseError;
use crate::node;
use crate::scenario::Defaults;
use crate::timing::{Retry, RetryPolicy, Timeout, Wait};

/// Fields recognized on every spec node. Plugin parsers skip these when
/// validating their own shapes.
pub const BASE_FIELDS: &[&str] = &["name", "description", "timeout", "wait", "retry"];

/// Fields common to every plugin's spec: identity, position, and the
/// per-spec timing overrides. Injected by the scenario during parse.
#[derive(Clone, Default, Debug)]
pub struct SpecBase {
    /// Name of the plugin that parsed this spec.
    pub plugin: String,
    /// The scenario's parsed defaults.
    pub defaults: Defaults,
    /// Position within the scenario's `tests` sequence.
    pub index: usize,
    /// Name for the individual test unit.
    pub name: String,
    /// Description of the test unit.
    pub description: String,
    /// Per-spec timeout override.
    pub timeout: Option<Timeout>,
    /// Waits applied around the spec's action.
    pub wait: Option<Wait>,
    /// Per-spec retry override.
    pub retry: Option<RetryPolicy>,
}

impl SpecBase {
    /// The spec's display title: its name, a slug of its description, or
    /// its index.
    pub fn title(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        if !self.description.is_empty() {
            return slugify(&self.description);
        }
        self.index.to_string()
    }

    /// Decode the base fields out of a spec mapping node, leaving plugin
    /// fields untouched.
    pub fn from_node(m: &Mapping, at: &str) -> Result<Self, ParseError> {
        let mut base = SpecBase::default();
        for (k, v) in m {
            let key = match node::key_str(k) {
                Some(k) => k,
                None => {
                    return Err(ParseError::ExpectedScalar { at: at.to_string() });
                }
            };
            match key {
                "name" => {
                    base.name = node::scalar_str(v).ok_or_else(|| ParseError::ExpectedScalar {
                        at: node::child(at, key),
                    })?;
                }
                "description" => {
                    base.description =
                        node::scalar_str(v).ok_or_else(|| ParseError::ExpectedScalar {
                            at: node::child(at, key),
                        })?;
                }
                "timeout" => {
                    base.timeout = Some(parse_timeout_node(v, &node::child(at, key))?);
                }
                "wait" => {
                    base.wait = Some(parse_wait_node(v, &node::child(at, key))?);
                }
                "retry" => {
                    base.retry = Some(RetryPolicy::Config(parse_retry_node(
                        v,
                        &node::child(at, key),
                    )?));
                }
                _ => {} // plugin-specific field
            }
        }
        Ok(base)
    }
}

/// Decode a timeout node, accepting both the scalar form (`timeout: "5s"`)
/// and the mapping form (`timeout: {after: "5s"}`).
pub(crate) fn parse_timeout_node(v: &Value, at: &str) -> Result<Timeout, ParseError> {
    let after = match v {
        Value::Mapping(m) => m
            .get("after")
            .and_then(node::scalar_str)
            .ok_or_else(|| ParseError::ExpectedTimeout { at: at.to_string() })?,
        other => node::scalar_str(other)
            .ok_or_else(|| ParseError::ExpectedScalarOrMap { at: at.to_string() })?,
    };
    let d = parse_duration(&after).map_err(|_| ParseError::InvalidDuration {
        at: at.to_string(),
        value: after.clone(),
    })?;
    Ok(Timeout::new(d))
}

/// Decode a wait node (`wait: {before: "2s", after: "1s"}`).
pub(crate) fn parse_wait_node(v: &Value, at: &str) -> Result<Wait, ParseError> {
    let m = v
        .as_mapping()
        .ok_or_else(|| ParseError::ExpectedMap { at: at.to_string() })?;
    let mut wait = Wait::default();
    for (k, val) in m {
        let key = match node::key_str(k) {
            Some(k) => k,
            None => return Err(ParseError::ExpectedScalar { at: at.to_string() }),
        };
        match key {
            "before" | "after" => {
                let raw = node::scalar_str(val).ok_or_else(|| ParseError::ExpectedWait {
                    at: node::child(at, key),
                })?;
                let d = parse_duration(&raw).map_err(|_| ParseError::InvalidDuration {
                    at: node::child(at, key),
                    value: raw.clone(),
                })?;
                match key {
                    "before" => wait.before = Some(d),
                    _ => wait.after = Some(d),
                }
            }
            _ => {}
        }
    }
    Ok(wait)
}

/// Decode a retry node (`retry: {attempts: 3, interval: "10ms",
/// exponential: true}`), rejecting non-positive attempt counts.
pub(crate) fn parse_retry_node(v: &Value, at: &str) -> Result<Retry, ParseError> {
    let m = v
        .as_mapping()
        .ok_or_else(|| ParseError::ExpectedMap { at: at.to_string() })?;
    let mut retry = Retry::default();
    for (k, val) in m {
        let key = match node::key_str(k) {
            Some(k) => k,
            None => return Err(ParseError::ExpectedScalar { at: at.to_string() }),
        };
        match key {
            "attempts" => {
                let attempts = node::scalar_i64(val).ok_or_else(|| ParseError::ExpectedInt {
                    at: node::child(at, key),
                })?;
                if attempts < 1 {
                    return Err(ParseError::InvalidRetryAttempts {
                        at: node::child(at, key),
                        attempts,
                    });
                }
                retry.attempts = Some(attempts as u32);
            }
            "interval" => {
                let raw = node::scalar_str(val).ok_or_else(|| ParseError::ExpectedRetry {
                    at: node::child(at, key),
                })?;
                let d = parse_duration(&raw).map_err(|_| ParseError::InvalidDuration {
                    at: node::child(at, key),
                    value: raw.clone(),
                })?;
                retry.interval = Some(d);
            }
            "exponential" => {
                retry.exponential =
                    node::scalar_bool(val).ok_or_else(|| ParseError::ExpectedRetry {
                        at: node::child(at, key),
                    })?;
            }
            _ => {}
        }
    }
    Ok(retry)
}

/// Lowercase the string and map spaces and slashes to dashes, collapsing
/// runs of dashes and trimming them from the ends.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true; // swallow leading dashes
    for c in s.trim().to_lowercase().chars() {
        let mapped = match c {
            ' ' | '/' => Some('-'),
            'a'..='z' | '0'..='9' => Some(c),
            '-' => Some('-'),
            _ => None,
        };
        match mapped {
            Some('-') => {
                if !last_dash {
                    out.push('-');
                    last_dash = true;
                }
            }
            Some(c) => {
                out.push(c);
                last_dash = false;
            }
            None => {}
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
