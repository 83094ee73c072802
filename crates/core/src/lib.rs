//! Specrun: a declarative, YAML-driven functional test runner
//!
//! Test authors describe scenarios as ordered sequences of specs; each
//! spec names an action and a set of assertions over that action's
//! observable output. Plugins teach the parser new spec shapes; the
//! runner executes specs in order, honoring wait/timeout/retry semantics
//! and threading prior-run data forward.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Scenario (YAML)                                         │
//! │    ├── name, description, fixtures                       │
//! │    ├── defaults: {<plugin>: …, timeout, retry}           │
//! │    ├── skip-if: [spec, …]                                │
//! │    └── tests:   [spec, …]   each bound to one plugin     │
//! ├──────────────────────────────────────────────────────────┤
//! │  Runner                                                  │
//! │    ├── timeout-conflict pre-flight                       │
//! │    ├── fixture start/stop lifecycle                      │
//! │    ├── skip-if evaluation                                │
//! │    └── per spec: wait → retry loop ⟷ deadline → wait     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use specrun_core::{RunContext, Scenario};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! specrun_core::register_builtin_plugins();
//!
//! let scenario = Scenario::from_yaml(
//!     r#"
//! name: smoke
//! tests:
//!   - exec: "echo cat"
//!     assert:
//!       out:
//!         contains: cat
//! "#,
//! )?;
//!
//! let result = scenario.run(&RunContext::new()).await?;
//! assert!(result.passed());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod debug;
pub mod duration;
pub mod errors;
pub mod exec;
pub mod expand;
pub mod fixture;
pub mod flex;
pub mod node;
pub mod plugin;
pub mod registry;
pub mod result;
pub mod runner;
pub mod scenario;
pub mod spec;
pub mod suite;
pub mod timing;

pub use context::RunContext;
pub use errors::{Failure, ParseError, RuntimeError};
pub use fixture::{Fixture, GenericFixture};
pub use plugin::{Evaluable, Plugin, PluginInfo, SpecParser};
pub use result::SpecResult;
pub use runner::{ScenarioResult, SpecReport};
pub use scenario::Scenario;
pub use suite::{Suite, SuiteResult};
pub use timing::{Retry, RetryPolicy, Timeout, Wait};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Register every plugin that ships with the crate. Embedders call this
/// once before parsing scenarios.
pub fn register_builtin_plugins() {
    exec::register();
}
