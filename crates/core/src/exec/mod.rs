//! Reference plugin executing commands via the operating system
//!
//! A spec owned by this plugin names a command to run (`exec`), optionally
//! through a shell (`shell`), and asserts over the captured exit code,
//! stdout, and stderr. On assertion failure an optional `on.fail` action
//! runs and its output goes to the debug sinks. The `var` section saves
//! execution outputs into the prior-run cache for later specs.

mod assertions;

pub use assertions::{Expect, PipeExpect};

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use serde_yaml::Mapping;
use tokio::process::Command;
use tracing::debug;

use crate::context::RunContext;
use crate::debug::debug_println;
use crate::errors::{ParseError, RuntimeError};
use crate::node;
use crate::plugin::{Evaluable, Plugin, PluginDefaults, PluginInfo, SpecParser};
use crate::registry;
use crate::result::SpecResult;
use crate::spec::{SpecBase, BASE_FIELDS};
use crate::timing::Timeout;

pub const PLUGIN_NAME: &str = "exec";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Register the exec plugin with the process-wide registry.
pub fn register() {
    registry::register(Arc::new(ExecPlugin));
}

pub struct ExecPlugin;

impl Plugin for ExecPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: PLUGIN_NAME.to_string(),
            description: "executes commands and asserts over exit code and output".to_string(),
            timeout: Some(Timeout::new(DEFAULT_TIMEOUT)),
            ..PluginInfo::default()
        }
    }

    fn parse_defaults(&self, _doc: &Mapping) -> Result<PluginDefaults, ParseError> {
        // No tunable defaults yet; the section is accepted and ignored.
        Ok(Arc::new(ExecDefaults))
    }

    fn specs(&self) -> Vec<Box<dyn SpecParser>> {
        vec![Box::new(ExecSpecParser)]
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecDefaults;

struct ExecSpecParser;

impl SpecParser for ExecSpecParser {
    fn detect(&self, m: &Mapping) -> bool {
        node::has_key(m, "exec")
    }

    fn parse(&self, m: &Mapping, at: &str) -> Result<Box<dyn Evaluable>, ParseError> {
        Ok(Box::new(ExecSpec::from_node(m, at)?))
    }
}

/// A command to run, shared by the spec's action and `on.fail`.
#[derive(Debug, Clone, Default)]
pub struct Action {
    /// The exact command to execute.
    pub exec: String,
    /// Shell to execute the command with. Without one, the command string
    /// is split into words and executed directly.
    pub shell: Option<String>,
}

/// Actions taken upon certain conditions.
#[derive(Debug, Clone, Default)]
pub struct On {
    /// Runs when any of the spec's assertions fail.
    pub fail: Option<Action>,
}

/// Where a saved variable's value is sourced from: `stdout`, `stderr`,
/// `returncode`, or the name of an environment variable.
#[derive(Debug, Clone)]
pub struct VarEntry {
    pub from: String,
}

/// A spec that executes one command and asserts over its output.
#[derive(Default, Debug)]
pub struct ExecSpec {
    base: SpecBase,
    exec: String,
    shell: Option<String>,
    assert: Option<Expect>,
    on: Option<On>,
    var: HashMap<String, VarEntry>,
}

impl ExecSpec {
    fn from_node(m: &Mapping, at: &str) -> Result<Self, ParseError> {
        let mut spec = ExecSpec::default();
        for (k, v) in m {
            let key = match node::key_str(k) {
                Some(k) => k,
                None => return Err(ParseError::ExpectedScalar { at: at.to_string() }),
            };
            match key {
                "exec" => {
                    let exec = node::scalar_str(v).ok_or_else(|| ParseError::ExpectedScalar {
                        at: node::child(at, key),
                    })?;
                    spec.exec = exec.trim().to_string();
                    if spec.exec.is_empty() {
                        return Err(ParseError::Invalid {
                            at: node::child(at, key),
                            msg: "exec may not be empty".to_string(),
                        });
                    }
                }
                "shell" => {
                    let shell = node::scalar_str(v).ok_or_else(|| ParseError::ExpectedScalar {
                        at: node::child(at, key),
                    })?;
                    spec.shell = Some(shell.trim().to_string());
                }
                "assert" => {
                    let am = v.as_mapping().ok_or_else(|| ParseError::ExpectedMap {
                        at: node::child(at, key),
                    })?;
                    spec.assert = Some(Expect::from_node(am, &node::child(at, key))?);
                }
                "on" => {
                    let om = v.as_mapping().ok_or_else(|| ParseError::ExpectedMap {
                        at: node::child(at, key),
                    })?;
                    spec.on = Some(parse_on(om, &node::child(at, key))?);
                }
                "var" => {
                    let vm = v.as_mapping().ok_or_else(|| ParseError::ExpectedMap {
                        at: node::child(at, key),
                    })?;
                    spec.var = parse_vars(vm, &node::child(at, key))?;
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
        if spec.exec.is_empty() {
            return Err(ParseError::Invalid {
                at: at.to_string(),
                msg: "exec may not be empty".to_string(),
            });
        }
        if spec.shell.is_none() {
            // Without a shell the command string must split into words.
            let words = shell_words::split(&spec.exec).map_err(|e| ParseError::Invalid {
                at: node::child(at, "exec"),
                msg: format!("invalid exec: {}", e),
            })?;
            if words.is_empty() {
                return Err(ParseError::Invalid {
                    at: node::child(at, "exec"),
                    msg: "exec may not be empty".to_string(),
                });
            }
        }
        Ok(spec)
    }
}

fn parse_on(m: &Mapping, at: &str) -> Result<On, ParseError> {
    let mut on = On::default();
    for (k, v) in m {
        let key = match node::key_str(k) {
            Some(k) => k,
            None => return Err(ParseError::ExpectedScalar { at: at.to_string() }),
        };
        match key {
            "fail" => {
                let fm = v.as_mapping().ok_or_else(|| ParseError::ExpectedMap {
                    at: node::child(at, key),
                })?;
                on.fail = Some(parse_action(fm, &node::child(at, key))?);
            }
            _ => {
                return Err(ParseError::UnknownField {
                    at: at.to_string(),
                    field: key.to_string(),
                });
            }
        }
    }
    Ok(on)
}

fn parse_action(m: &Mapping, at: &str) -> Result<Action, ParseError> {
    let mut action = Action::default();
    for (k, v) in m {
        let key = match node::key_str(k) {
            Some(k) => k,
            None => return Err(ParseError::ExpectedScalar { at: at.to_string() }),
        };
        match key {
            "exec" => {
                action.exec = node::scalar_str(v)
                    .ok_or_else(|| ParseError::ExpectedScalar {
                        at: node::child(at, key),
                    })?
                    .trim()
                    .to_string();
            }
            "shell" => {
                action.shell = node::scalar_str(v).map(|s| s.trim().to_string());
            }
            _ => {
                return Err(ParseError::UnknownField {
                    at: at.to_string(),
                    field: key.to_string(),
                });
            }
        }
    }
    if action.exec.is_empty() {
        return Err(ParseError::Invalid {
            at: at.to_string(),
            msg: "exec may not be empty".to_string(),
        });
    }
    Ok(action)
}

fn parse_vars(m: &Mapping, at: &str) -> Result<HashMap<String, VarEntry>, ParseError> {
    let mut vars = HashMap::new();
    for (k, v) in m {
        let name = match node::key_str(k) {
            Some(k) => k.to_string(),
            None => return Err(ParseError::ExpectedScalar { at: at.to_string() }),
        };
        let vm = v.as_mapping().ok_or_else(|| ParseError::ExpectedMap {
            at: node::child(at, &name),
        })?;
        let from = vm
            .get("from")
            .and_then(node::scalar_str)
            .ok_or_else(|| ParseError::ExpectedScalar {
                at: node::child(&node::child(at, &name), "from"),
            })?;
        vars.insert(name, VarEntry { from });
    }
    Ok(vars)
}

#[async_trait]
impl Evaluable for ExecSpec {
    async fn eval(&self, ctx: &RunContext) -> Result<SpecResult, RuntimeError> {
        let execution = run_action(ctx, &self.exec, self.shell.as_deref()).await?;

        let failures = assertions::failures(
            ctx,
            self.assert.as_ref(),
            execution.exit_code,
            &execution.stdout,
            &execution.stderr,
        );
        let mut result = SpecResult::with_failures(failures);

        if result.failed() {
            if let Some(action) = self.on.as_ref().and_then(|o| o.fail.as_ref()) {
                debug_println(ctx, &format!("exec: on.fail: {}", action.exec));
                if let Ok(fallback) = run_action(ctx, &action.exec, action.shell.as_deref()).await
                {
                    debug_println(ctx, &format!("exec: on.fail out: {}", fallback.stdout.trim()));
                }
            }
        }

        for (name, entry) in &self.var {
            let value: JsonValue = match entry.from.as_str() {
                "stdout" => json!(execution.stdout.trim()),
                "stderr" => json!(execution.stderr.trim()),
                "returncode" => json!(execution.exit_code),
                env_name => match std::env::var(env_name) {
                    Ok(v) => json!(v),
                    Err(_) => continue,
                },
            };
            result.set_data(name.clone(), value);
        }

        Ok(result)
    }

    fn set_base(&mut self, base: SpecBase) {
        self.base = base;
    }

    fn base(&self) -> &SpecBase {
        &self.base
    }
}

struct Execution {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

async fn run_action(
    ctx: &RunContext,
    exec: &str,
    shell: Option<&str>,
) -> Result<Execution, RuntimeError> {
    let mut cmd = match shell {
        Some(sh) => {
            let mut cmd = Command::new(sh);
            cmd.arg("-c").arg(exec);
            cmd
        }
        None => {
            let words = shell_words::split(exec)
                .map_err(|e| RuntimeError::Eval(format!("exec: {}", e)))?;
            let (program, args) = words
                .split_first()
                .ok_or_else(|| RuntimeError::Eval("exec: empty command".to_string()))?;
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
    };

    debug!(command = %exec, shell = ?shell, "executing");
    debug_println(ctx, &format!("exec: {}", exec));

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .map_err(|e| RuntimeError::Eval(format!("exec: {}: {}", exec, e)))?;

    Ok(Execution {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        // Terminated by signal when no code is present.
        exit_code: output.status.code().unwrap_or(-1),
    })
}
