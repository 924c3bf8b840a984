// ABOUTME: Parsed branch conditions for condition nodes
// ABOUTME: Single numeric comparison parsed once at definition-load time

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::error::DefinitionError;
use super::workflow::Variables;

/// A single numeric comparison of the shape `<variable> <op> <threshold>`,
/// e.g. `"amount > 5000"`. Malformed expressions are rejected when the
/// definition is loaded, never at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    pub variable: String,
    pub op: ComparisonOp,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Gt,
    Lt,
    Eq,
    Ge,
    Le,
}

impl Condition {
    /// Evaluate against the task's workflow variables. A missing or
    /// non-numeric variable makes the comparison unsatisfiable: not met.
    pub fn evaluate(&self, variables: &Variables) -> bool {
        let Some(value) = variables.get(&self.variable) else {
            return false;
        };
        let Some(actual) = numeric(value) else {
            return false;
        };

        match self.op {
            ComparisonOp::Gt => actual > self.threshold,
            ComparisonOp::Lt => actual < self.threshold,
            ComparisonOp::Eq => (actual - self.threshold).abs() < f64::EPSILON,
            ComparisonOp::Ge => actual >= self.threshold,
            ComparisonOp::Le => actual <= self.threshold,
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl FromStr for Condition {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Two-character operators must be tried before their one-character
        // prefixes.
        const OPS: [(&str, ComparisonOp); 6] = [
            (">=", ComparisonOp::Ge),
            ("<=", ComparisonOp::Le),
            ("==", ComparisonOp::Eq),
            (">", ComparisonOp::Gt),
            ("<", ComparisonOp::Lt),
            ("=", ComparisonOp::Eq),
        ];

        for (token, op) in OPS {
            if let Some((lhs, rhs)) = s.split_once(token) {
                let variable = lhs.trim();
                let rhs = rhs.trim();

                if variable.is_empty() {
                    return Err(DefinitionError::InvalidCondition {
                        expression: s.to_string(),
                        reason: "missing variable name".to_string(),
                    });
                }

                let threshold = rhs.parse().map_err(|_| DefinitionError::InvalidCondition {
                    expression: s.to_string(),
                    reason: format!("'{}' is not a number", rhs),
                })?;

                return Ok(Self {
                    variable: variable.to_string(),
                    op,
                    threshold,
                });
            }
        }

        Err(DefinitionError::InvalidCondition {
            expression: s.to_string(),
            reason: "expected '<variable> <op> <number>'".to_string(),
        })
    }
}

impl TryFrom<String> for Condition {
    type Error = DefinitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.variable, self.op, self.threshold)
    }
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Gt => ">",
            ComparisonOp::Lt => "<",
            ComparisonOp::Eq => "=",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Le => "<=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
