//! Timeout, wait, and retry configuration
//!
//! These values can be attached at four levels (evaluable override, spec
//! base, scenario default, plugin default); the runner resolves the
//! effective value per spec. See `runner` for the precedence walk.

use std::time::Duration;

use crate::duration::format_duration;

/// Default interval between retry attempts when a retry policy is active
/// but does not configure one.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Initial interval for exponential backoff when none is configured.
pub const DEFAULT_BACKOFF_INITIAL: Duration = Duration::from_millis(500);

/// Multiplier applied to the interval after each exponential backoff tick.
pub const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Ceiling for the exponential backoff interval.
pub const MAX_BACKOFF_INTERVAL: Duration = Duration::from_secs(60);

/// Deadline within which a single spec's evaluation must complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeout {
    /// The amount of time the spec may take.
    pub after: Duration,
}

impl Timeout {
    pub fn new(after: Duration) -> Self {
        Self { after }
    }

    /// The deadline rendered back as a duration string.
    pub fn after_str(&self) -> String {
        format_duration(self.after)
    }
}

/// Pauses applied around a spec's evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wait {
    /// Pause before the spec's action executes.
    pub before: Option<Duration>,
    /// Pause after the spec's action executes.
    pub after: Option<Duration>,
}

impl Wait {
    /// Total pause contributed by this wait configuration.
    pub fn total(&self) -> Duration {
        self.before.unwrap_or_default() + self.after.unwrap_or_default()
    }
}

/// Configuration for re-running a spec's action when its assertions fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retry {
    /// Maximum number of evaluations. `None` means unbounded (until the
    /// deadline or success).
    pub attempts: Option<u32>,
    /// Interval between evaluations.
    pub interval: Option<Duration>,
    /// Apply exponential backoff, using `interval` (if set) as the initial
    /// interval.
    pub exponential: bool,
}

/// Retry behaviour attached at one precedence level.
///
/// `Disabled` explicitly turns retries off and is distinct from absence: a
/// level carrying `Disabled` short-circuits resolution, while an absent
/// value (`Option::None`) defers to the next level down. A plain
/// default-constructed [`Retry`] config does not disable anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Do not retry this spec, regardless of lower-precedence levels.
    Disabled,
    /// Retry with the given configuration.
    Config(Retry),
}

/// Which level a timing value was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetOn {
    #[default]
    None,
    /// A per-spec override.
    Spec,
    /// The scenario's `defaults` section.
    ScenarioDefault,
    /// The owning plugin's default.
    PluginDefault,
}

/// Aggregate wait and timeout durations for a scenario.
///
/// Computed at parse completion and checked against the harness budget
/// before the scenario starts.
#[derive(Debug, Clone, Default)]
pub struct Timings {
    /// Sum of all `wait.before` and `wait.after` values across specs.
    pub total_wait: Duration,
    /// The maximum effective timeout across specs.
    pub max_timeout: Duration,
    /// Where the maximum timeout was found.
    pub max_timeout_set_on: SetOn,
    /// Index of the spec carrying the maximum timeout.
    pub max_timeout_spec_index: usize,
}

impl Timings {
    pub fn add_wait(&mut self, d: Duration) {
        self.total_wait += d;
    }

    pub fn add_timeout(&mut self, d: Duration, on: SetOn, spec_index: usize) {
        if d.is_zero() {
            return;
        }
        if d > self.max_timeout {
            self.max_timeout = d;
            self.max_timeout_set_on = on;
            self.max_timeout_spec_index = spec_index;
        }
    }
}
