//! Assertions over a command's exit code and output pipes

use serde_yaml::Mapping;

use crate::context::RunContext;
use crate::errors::{Failure, ParseError};
use crate::expand::expand_prior_run;
use crate::flex::FlexStrings;
use crate::node;

/// Conditions asserted against an executed command.
#[derive(Debug, Clone, Default)]
pub struct Expect {
    /// Expected exit code. Zero (success) unless stated.
    pub exit_code: i32,
    /// Expectations over trimmed stdout.
    pub out: Option<PipeExpect>,
    /// Expectations over trimmed stderr.
    pub err: Option<PipeExpect>,
}

/// Expectations over the contents of one output pipe.
#[derive(Debug, Clone, Default)]
pub struct PipeExpect {
    /// Strings that must all be present.
    pub contains_all: Option<FlexStrings>,
    /// Strings of which at least one must be present.
    pub contains_any: Option<FlexStrings>,
    /// Strings none of which may be present.
    pub contains_none: Option<FlexStrings>,
}

impl Expect {
    pub(crate) fn from_node(m: &Mapping, at: &str) -> Result<Self, ParseError> {
        let mut expect = Expect::default();
        for (k, v) in m {
            let key = match node::key_str(k) {
                Some(k) => k,
                None => return Err(ParseError::ExpectedScalar { at: at.to_string() }),
            };
            match key {
                "exit-code" | "exit_code" => {
                    expect.exit_code =
                        node::scalar_i64(v).ok_or_else(|| ParseError::ExpectedInt {
                            at: node::child(at, key),
                        })? as i32;
                }
                "out" => {
                    let pm = v.as_mapping().ok_or_else(|| ParseError::ExpectedMap {
                        at: node::child(at, key),
                    })?;
                    expect.out = Some(PipeExpect::from_node(pm, &node::child(at, key))?);
                }
                "err" => {
                    let pm = v.as_mapping().ok_or_else(|| ParseError::ExpectedMap {
                        at: node::child(at, key),
                    })?;
                    expect.err = Some(PipeExpect::from_node(pm, &node::child(at, key))?);
                }
                _ => {
                    return Err(ParseError::UnknownField {
                        at: at.to_string(),
                        field: key.to_string(),
                    });
                }
            }
        }
        Ok(expect)
    }
}

impl PipeExpect {
    pub(crate) fn from_node(m: &Mapping, at: &str) -> Result<Self, ParseError> {
        let mut expect = PipeExpect::default();
        for (k, v) in m {
            let key = match node::key_str(k) {
                Some(k) => k,
                None => return Err(ParseError::ExpectedScalar { at: at.to_string() }),
            };
            let values = FlexStrings::from_node(v, &node::child(at, key))?;
            match key {
                "all" | "is" | "contains" | "contains-all" | "contains_all" => {
                    expect.contains_all = Some(values);
                }
                "any" | "contains-one-of" | "contains-any" | "contains_one_of" | "contains_any" => {
                    expect.contains_any = Some(values);
                }
                "none" | "none-of" | "none_of" | "contains-none-of" | "contains-none"
                | "contains_none_of" | "contains_none" => {
                    expect.contains_none = Some(values);
                }
                _ => {
                    return Err(ParseError::UnknownField {
                        at: at.to_string(),
                        field: key.to_string(),
                    });
                }
            }
        }
        Ok(expect)
    }
}

/// Evaluate the expectations against an execution's observed exit code and
/// pipe contents, returning the failed assertions.
pub(crate) fn failures(
    ctx: &RunContext,
    expect: Option<&Expect>,
    exit_code: i32,
    stdout: &str,
    stderr: &str,
) -> Vec<Failure> {
    let mut failures = Vec::new();

    let expected_exit = expect.map(|e| e.exit_code).unwrap_or(0);
    if expected_exit != exit_code {
        failures.push(Failure::NotEqual {
            expected: expected_exit.to_string(),
            got: exit_code.to_string(),
        });
    }

    if let Some(expect) = expect {
        if let Some(pipe) = &expect.out {
            check_pipe(ctx, pipe, "stdout", stdout.trim(), &mut failures);
        }
        if let Some(pipe) = &expect.err {
            check_pipe(ctx, pipe, "stderr", stderr.trim(), &mut failures);
        }
    }
    failures
}

fn check_pipe(
    ctx: &RunContext,
    expect: &PipeExpect,
    name: &str,
    contents: &str,
    failures: &mut Vec<Failure>,
) {
    if let Some(all) = &expect.contains_all {
        let values: Vec<String> = all
            .values()
            .iter()
            .map(|v| expand_prior_run(ctx, v))
            .collect();
        // A single expected value compares like equality; several compare
        // like membership.
        if values.len() == 1 {
            if !contents.contains(&values[0]) {
                failures.push(Failure::NotEqual {
                    expected: values[0].clone(),
                    got: contents.to_string(),
                });
            }
        } else {
            for value in values {
                if !contents.contains(&value) {
                    failures.push(Failure::NotIn {
                        element: value,
                        container: name.to_string(),
                    });
                }
            }
        }
    }

    if let Some(any) = &expect.contains_any {
        let values: Vec<String> = any
            .values()
            .iter()
            .map(|v| expand_prior_run(ctx, v))
            .collect();
        if !values.iter().any(|v| contents.contains(v.as_str())) {
            failures.push(Failure::NoneIn {
                elements: values,
                container: name.to_string(),
            });
        }
    }

    if let Some(none) = &expect.contains_none {
        for value in none.values() {
            let value = expand_prior_run(ctx, value);
            if contents.contains(&value) {
                failures.push(Failure::In {
                    element: value,
                    container: name.to_string(),
                });
            }
        }
    }
}
