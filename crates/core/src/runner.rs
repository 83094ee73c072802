//! Scenario execution
//!
//! Specs run strictly in order. Each spec's evaluation is launched as its
//! own task so it can be raced against the spec's deadline; a deadline
//! firing is an assertion failure for that spec, not a runtime error, and
//! never affects sibling specs. Prior-run data produced by a spec is
//! visible to every later spec in the same scenario run.

use std::cmp;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::context::RunContext;
use crate::debug::debug_println;
use crate::duration::format_duration;
use crate::errors::{Failure, RuntimeError};
use crate::fixture::Fixture;
use crate::plugin::Evaluable;
use crate::result::SpecResult;
use crate::scenario::Scenario;
use crate::timing::{
    RetryPolicy, Timeout, BACKOFF_MULTIPLIER, DEFAULT_BACKOFF_INITIAL, DEFAULT_RETRY_INTERVAL,
    MAX_BACKOFF_INTERVAL,
};

/// Outcome of one spec within a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct SpecReport {
    pub index: usize,
    pub title: String,
    /// Rendered assertion failures. Empty means the spec passed.
    pub failures: Vec<String>,
    /// Number of evaluations performed (more than 1 when a retry policy
    /// was active).
    pub attempts: u32,
    pub duration_ms: u64,
}

impl SpecReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Aggregate outcome of a scenario run.
///
/// Assertion failures are carried here; the error side of
/// [`Scenario::run`] is reserved for runtime errors.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    /// True if a `skip-if` condition matched and no spec ran.
    pub skipped: bool,
    pub specs: Vec<SpecReport>,
}

impl ScenarioResult {
    fn skipped(name: String) -> Self {
        Self {
            name,
            skipped: true,
            specs: Vec::new(),
        }
    }

    /// True if every spec passed (or the scenario was skipped).
    pub fn passed(&self) -> bool {
        self.specs.iter().all(SpecReport::passed)
    }

    /// Total number of assertion failures across specs.
    pub fn failure_count(&self) -> usize {
        self.specs.iter().map(|s| s.failures.len()).sum()
    }
}

struct EvalOutcome {
    result: SpecResult,
    attempts: u32,
}

impl Scenario {
    /// Execute the scenario. The returned error is always a runtime error
    /// and represents an unrecoverable condition; assertion failures are
    /// reported in the [`ScenarioResult`].
    pub async fn run(&self, ctx: &RunContext) -> Result<ScenarioResult, RuntimeError> {
        let ctx = ctx.push_trace(self.title());
        self.check_timeout_conflict(&ctx)?;

        // Fixtures start in declaration order and stop in reverse on every
        // exit path.
        let mut started: Vec<Arc<dyn Fixture>> = Vec::new();
        let mut start_err = None;
        for name in &self.fixtures {
            let Some(fixture) = ctx.fixture(name) else {
                start_err = Some(RuntimeError::RequiredFixtureMissing(name.clone()));
                break;
            };
            debug!(fixture = %name, "starting fixture");
            match fixture.start(&ctx).await {
                Ok(()) => started.push(fixture),
                Err(e) => {
                    start_err = Some(e);
                    break;
                }
            }
        }

        let outcome = match start_err {
            Some(e) => Err(e),
            None => self.run_specs(&ctx).await,
        };

        for fixture in started.iter().rev() {
            fixture.stop(&ctx).await;
        }
        outcome
    }

    async fn run_specs(&self, ctx: &RunContext) -> Result<ScenarioResult, RuntimeError> {
        // Pre-flight conditions: if any passes, the whole scenario is
        // skipped.
        for condition in &self.skip_if {
            let res = condition.eval(ctx).await?;
            if !res.failed() {
                info!(
                    scenario = %self.title(),
                    condition = %condition.base().title(),
                    "skip-if condition passed, skipping scenario"
                );
                return Ok(ScenarioResult::skipped(self.title()));
            }
        }

        let mut ctx = ctx.clone();
        let mut reports = Vec::with_capacity(self.tests.len());
        for (index, spec) in self.tests.iter().enumerate() {
            let (report, data) = self.run_spec(&ctx, index, spec).await?;

            if report.passed() {
                info!(spec = %report.title, attempts = report.attempts, "spec passed");
            } else {
                for failure in &report.failures {
                    error!(spec = %report.title, %failure, "spec failed");
                }
            }
            reports.push(report);

            // Thread run data forward so the next spec sees it.
            if !data.is_empty() {
                ctx = ctx.store_prior_run(data);
            }
        }

        Ok(ScenarioResult {
            name: self.title(),
            skipped: false,
            specs: reports,
        })
    }

    async fn run_spec(
        &self,
        ctx: &RunContext,
        index: usize,
        spec: &Arc<dyn Evaluable>,
    ) -> Result<(SpecReport, std::collections::HashMap<String, serde_json::Value>), RuntimeError>
    {
        let base = spec.base();
        let token = if base.name.is_empty() {
            index.to_string()
        } else {
            format!("{}:{}", index, base.name)
        };
        // A fresh derived context per spec: its deadline must not affect
        // siblings.
        let spec_ctx = ctx.push_trace(token);
        let started = Instant::now();

        if let Some(before) = base.wait.as_ref().and_then(|w| w.before) {
            debug_println(
                &spec_ctx,
                &format!("wait: {} before", format_duration(before)),
            );
            sleep(before).await;
        }

        let retry = self.effective_retry(&spec_ctx, spec);
        let timeout = self.effective_timeout(&spec_ctx, spec);

        let (tx, rx) = oneshot::channel();
        let evaluable = Arc::clone(spec);
        let eval_ctx = spec_ctx.clone();
        let eval_retry = retry.clone();
        let handle = tokio::spawn(async move {
            let _ = tx.send(eval_with_retry(evaluable, eval_ctx, eval_retry).await);
        });

        // Race the evaluation task against the spec's deadline.
        let received = match &timeout {
            Some(to) => match tokio::time::timeout(to.after, rx).await {
                Ok(received) => Some(received),
                Err(_) => {
                    handle.abort();
                    None
                }
            },
            None => Some(rx.await),
        };

        let outcome = match received {
            None => {
                let after = timeout.as_ref().map(|t| t.after_str()).unwrap_or_default();
                warn!(spec = %base.title(), %after, "spec deadline exceeded");
                // Deadline expiry is an assertion failure, not a runtime
                // error; later specs still run.
                let report = SpecReport {
                    index,
                    title: base.title(),
                    failures: vec![Failure::TimeoutExceeded { after }.to_string()],
                    attempts: 0,
                    duration_ms: started.elapsed().as_millis() as u64,
                };
                return Ok((report, Default::default()));
            }
            Some(Err(_)) => {
                return Err(RuntimeError::Eval(
                    "spec evaluation task terminated unexpectedly".to_string(),
                ));
            }
            Some(Ok(Err(e))) => return Err(e),
            Some(Ok(Ok(outcome))) => outcome,
        };

        if let Some(after) = base.wait.as_ref().and_then(|w| w.after) {
            debug_println(&spec_ctx, &format!("wait: {} after", format_duration(after)));
            sleep(after).await;
        }

        let mut result = outcome.result;
        for failure in result.failures() {
            debug_println(&spec_ctx, &format!("failure: {}", failure));
        }
        let data = result.take_data();
        let report = SpecReport {
            index,
            title: base.title(),
            failures: result.failures().iter().map(ToString::to_string).collect(),
            attempts: outcome.attempts,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        Ok((report, data))
    }

    /// Effective timeout for a spec: evaluable override, then the spec
    /// base, then the scenario default, then the plugin default.
    fn effective_timeout(&self, ctx: &RunContext, spec: &Arc<dyn Evaluable>) -> Option<Timeout> {
        let timeout = spec
            .timeout()
            .or_else(|| spec.base().timeout.clone())
            .or_else(|| self.scenario_defaults().and_then(|d| d.timeout.clone()))
            .or_else(|| {
                ctx.plugin(&spec.base().plugin)
                    .and_then(|p| p.info().timeout)
            });
        if let Some(to) = &timeout {
            debug_println(ctx, &format!("using timeout of {}", to.after_str()));
        }
        timeout
    }

    /// Effective retry for a spec, with the same precedence as timeouts.
    /// A `Disabled` policy short-circuits wherever it appears.
    fn effective_retry(&self, ctx: &RunContext, spec: &Arc<dyn Evaluable>) -> Option<RetryPolicy> {
        let retry = spec
            .retry()
            .or_else(|| spec.base().retry.clone())
            .or_else(|| self.scenario_defaults().and_then(|d| d.retry.clone()))
            .or_else(|| ctx.plugin(&spec.base().plugin).and_then(|p| p.info().retry));
        if let Some(RetryPolicy::Config(config)) = &retry {
            debug_println(ctx, &format!("using retry {:?}", config));
        }
        retry
    }

    /// Fail fast when the scenario's waits or timeouts cannot fit inside
    /// the harness's own budget.
    fn check_timeout_conflict(&self, ctx: &RunContext) -> Result<(), RuntimeError> {
        let Some(budget) = ctx.budget() else {
            return Ok(());
        };
        let timings = self.timings();
        debug_println(
            ctx,
            &format!("harness budget: {}", format_duration(budget)),
        );
        let required = cmp::max(timings.total_wait, timings.max_timeout);
        if required > budget {
            return Err(RuntimeError::TimeoutConflict {
                required: format_duration(required),
                budget: format_duration(budget),
            });
        }
        Ok(())
    }
}

/// Drive a spec's evaluation under its retry policy.
///
/// With no policy (or an explicitly disabled one) the spec evaluates once.
/// Otherwise the first evaluation happens immediately, and failing results
/// are re-evaluated on a constant interval or exponential backoff until
/// success, the attempt ceiling, a runtime error, or cancellation of the
/// surrounding task.
async fn eval_with_retry(
    spec: Arc<dyn Evaluable>,
    ctx: RunContext,
    retry: Option<RetryPolicy>,
) -> Result<EvalOutcome, RuntimeError> {
    let config = match retry {
        None | Some(RetryPolicy::Disabled) => {
            let result = spec.eval(&ctx).await?;
            debug_println(
                &ctx,
                &format!("spec/run: single-shot (no retries) ok: {}", !result.failed()),
            );
            return Ok(EvalOutcome {
                result,
                attempts: 1,
            });
        }
        Some(RetryPolicy::Config(config)) => config,
    };

    let max_attempts = config.attempts.unwrap_or(0);
    let mut interval = if config.exponential {
        config.interval.unwrap_or(DEFAULT_BACKOFF_INITIAL)
    } else {
        config.interval.unwrap_or(DEFAULT_RETRY_INTERVAL)
    };

    let started = Instant::now();
    let mut attempts: u32 = 1;
    loop {
        let result = spec.eval(&ctx).await?;
        let ok = !result.failed();
        debug_println(
            &ctx,
            &format!(
                "spec/run: attempt {} after {} ok: {}",
                attempts,
                format_duration(round_millis(started.elapsed())),
                ok
            ),
        );
        if ok {
            return Ok(EvalOutcome { result, attempts });
        }
        for failure in result.failures() {
            debug_println(
                &ctx,
                &format!("spec/run: attempt {} failure: {}", attempts, failure),
            );
        }
        if max_attempts > 0 && attempts >= max_attempts {
            debug_println(
                &ctx,
                &format!("spec/run: exceeded max attempts {}. stopping.", max_attempts),
            );
            return Ok(EvalOutcome { result, attempts });
        }
        attempts += 1;
        sleep(interval).await;
        if config.exponential {
            interval = cmp::min(interval.mul_f64(BACKOFF_MULTIPLIER), MAX_BACKOFF_INTERVAL);
        }
    }
}

fn round_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
