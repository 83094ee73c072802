//! Runner behaviour: ordering, retries, timeouts, fixtures, skip-if

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use specrun_core::context::RunContext;
use specrun_core::errors::RuntimeError;
use specrun_core::scenario::Scenario;

use common::{eval_count, register_stub_plugins, RecorderFixture};

fn ctx() -> RunContext {
    register_stub_plugins();
    RunContext::new()
}

#[tokio::test]
async fn test_all_specs_pass() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
name: happy
tests:
  - sim: run-pass-1
  - sim: run-pass-2
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(result.passed());
    assert!(!result.skipped);
    assert_eq!(result.specs.len(), 2);
    assert_eq!(eval_count("run-pass-1"), 1);
    assert_eq!(eval_count("run-pass-2"), 1);
}

#[tokio::test]
async fn test_failing_spec_does_not_stop_the_loop() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
tests:
  - sim: run-fail-first
    pass-on-attempt: 0
  - sim: run-fail-second
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(!result.passed());
    assert_eq!(result.failure_count(), 1);
    // The second spec still ran.
    assert_eq!(eval_count("run-fail-second"), 1);
}

#[tokio::test]
async fn test_prior_run_data_threads_forward() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
tests:
  - prior-state: alpha
  - prior-state: beta
    prior-expect: alpha
  - prior-state: gamma
    prior-expect: beta
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(result.passed(), "failures: {:?}", result.specs);
}

#[tokio::test]
async fn test_skip_if_skips_everything() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
skip-if:
  - sim: run-skip-cond
tests:
  - sim: run-skip-body
    pass-on-attempt: 0
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(result.skipped);
    assert!(result.specs.is_empty());
    // The failing test spec never evaluated.
    assert_eq!(eval_count("run-skip-body"), 0);
}

#[tokio::test]
async fn test_failing_skip_if_runs_the_scenario() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
skip-if:
  - sim: run-noskip-cond
    pass-on-attempt: 0
tests:
  - sim: run-noskip-body
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(!result.skipped);
    assert_eq!(eval_count("run-noskip-body"), 1);
}

#[tokio::test]
async fn test_retry_attempt_ceiling() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
defaults:
  retry:
    attempts: 3
    interval: "10ms"
tests:
  - sim: run-retry-ceiling
    pass-on-attempt: 0
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(!result.passed());
    assert_eq!(result.specs[0].attempts, 3);
    assert_eq!(eval_count("run-retry-ceiling"), 3);
}

#[tokio::test]
async fn test_retry_single_attempt_evaluates_once() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
tests:
  - sim: run-retry-once
    pass-on-attempt: 0
    retry:
      attempts: 1
      interval: "10ms"
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(!result.passed());
    assert_eq!(eval_count("run-retry-once"), 1);
}

#[tokio::test]
async fn test_retry_until_success() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
tests:
  - sim: run-retry-succeeds
    pass-on-attempt: 2
    retry:
      attempts: 5
      interval: "10ms"
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(result.passed());
    assert_eq!(result.specs[0].attempts, 2);
    assert_eq!(eval_count("run-retry-succeeds"), 2);
}

#[tokio::test]
async fn test_no_retry_sentinel_beats_scenario_default() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
defaults:
  retry:
    attempts: 3
    interval: "10ms"
tests:
  - sim: run-no-retry
    pass-on-attempt: 0
    no-retry: true
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(!result.passed());
    // Disabled at the evaluable level: a single shot despite the default.
    assert_eq!(eval_count("run-no-retry"), 1);
}

#[tokio::test]
async fn test_timeout_is_a_failure_not_an_error() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
tests:
  - sim: run-timeout-slow
    sleep-ms: 500
    timeout: "50ms"
  - sim: run-timeout-next
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(!result.passed());
    assert!(result.specs[0].failures[0].contains("timeout exceeded"));
    // The deadline only affected its own spec.
    assert_eq!(eval_count("run-timeout-next"), 1);
}

#[tokio::test]
async fn test_runtime_error_aborts_the_scenario() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
tests:
  - sim: run-rterr
    runtime-error: true
  - sim: run-rterr-next
"#,
    )
    .unwrap();
    let err = scenario.run(&ctx()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Eval(_)));
    assert_eq!(eval_count("run-rterr-next"), 0);
}

#[tokio::test]
async fn test_wait_before_and_after() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
tests:
  - sim: run-wait
    wait:
      before: "50ms"
      after: "50ms"
"#,
    )
    .unwrap();
    let started = Instant::now();
    let result = scenario.run(&ctx()).await.unwrap();
    assert!(result.passed());
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_fixtures_start_in_order_and_stop_in_reverse() {
    common::register_stub_plugins();
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let ctx = ctx()
        .with_fixture("First", Arc::new(RecorderFixture::new("first", log.clone())))
        .with_fixture("second", Arc::new(RecorderFixture::new("second", log.clone())));

    let scenario = Scenario::from_yaml(
        r#"
fixtures:
  - first
  - SECOND
tests:
  - sim: run-fixture-order
"#,
    )
    .unwrap();
    let result = scenario.run(&ctx).await.unwrap();
    assert!(result.passed());
    assert_eq!(
        *log.lock(),
        vec!["start:first", "start:second", "stop:second", "stop:first"]
    );
}

#[tokio::test]
async fn test_missing_fixture_aborts_before_any_spec() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
fixtures:
  - missing
tests:
  - sim: run-fixture-missing
"#,
    )
    .unwrap();
    let err = scenario.run(&ctx()).await.unwrap_err();
    match err {
        RuntimeError::RequiredFixtureMissing(name) => assert_eq!(name, "missing"),
        other => panic!("expected RequiredFixtureMissing, got {other}"),
    }
    assert_eq!(eval_count("run-fixture-missing"), 0);
}

#[tokio::test]
async fn test_fixture_start_failure_stops_started_fixtures() {
    common::register_stub_plugins();
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let ctx = ctx()
        .with_fixture("good", Arc::new(RecorderFixture::new("good", log.clone())))
        .with_fixture("bad", Arc::new(RecorderFixture::failing("bad", log.clone())));

    let scenario = Scenario::from_yaml(
        r#"
fixtures:
  - good
  - bad
tests:
  - sim: run-fixture-bad-start
"#,
    )
    .unwrap();
    let err = scenario.run(&ctx).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Fixture { .. }));
    assert_eq!(eval_count("run-fixture-bad-start"), 0);
    // The fixture that did start was stopped.
    assert_eq!(*log.lock(), vec!["start:good", "start:bad", "stop:good"]);
}

#[tokio::test]
async fn test_timeout_conflict_with_harness_budget() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
tests:
  - sim: run-budget
    wait:
      before: "2s"
"#,
    )
    .unwrap();
    let ctx = ctx().with_budget(Duration::from_secs(1));
    let err = scenario.run(&ctx).await.unwrap_err();
    assert!(matches!(err, RuntimeError::TimeoutConflict { .. }));
    assert_eq!(eval_count("run-budget"), 0);
}

#[tokio::test]
async fn test_budget_that_fits_runs_normally() {
    common::register_stub_plugins();
    let scenario = Scenario::from_yaml(
        r#"
tests:
  - sim: run-budget-fits
    wait:
      before: "10ms"
"#,
    )
    .unwrap();
    let ctx = ctx().with_budget(Duration::from_secs(30));
    let result = scenario.run(&ctx).await.unwrap();
    assert!(result.passed());
}
