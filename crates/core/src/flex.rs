//! Scalar-or-sequence string fields

use serde_yaml::Value;

use crate::errors::ParseError;
use crate::node;

/// A YAML field that accepts either a single string or a sequence of
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlexStrings(Vec<String>);

impl FlexStrings {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    /// The contained collection of string values.
    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse from a scalar or sequence node.
    pub fn from_node(v: &Value, at: &str) -> Result<Self, ParseError> {
        match v {
            Value::Sequence(seq) => {
                let mut values = Vec::with_capacity(seq.len());
                for (i, item) in seq.iter().enumerate() {
                    let s = node::scalar_str(item).ok_or_else(|| {
                        ParseError::ExpectedScalarOrSequence {
                            at: node::elem(at, i),
                        }
                    })?;
                    values.push(s);
                }
                Ok(Self(values))
            }
            other => {
                let s = node::scalar_str(other).ok_or_else(|| {
                    ParseError::ExpectedScalarOrSequence { at: at.to_string() }
                })?;
                Ok(Self(vec![s]))
            }
        }
    }
}
