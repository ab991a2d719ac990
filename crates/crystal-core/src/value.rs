use std::fmt;

use crate::ast::{BinOp, Comparator};
use crate::error::ScriptError;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Integral numbers print without a fractional part.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parses text the way arithmetic sees it: optional sign, digits, optional
/// fraction. Words like `inf` or `nan` are not numbers here.
fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix(|c| c == '-' || c == '+').unwrap_or(trimmed);
    if digits.is_empty()
        || !digits.chars().any(|c| c.is_ascii_digit())
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }
    trimmed.parse().ok()
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_number(s),
            Value::Bool(_) => None,
        }
    }

    pub fn as_string(&self) -> String {
        self.to_string()
    }

    fn expect_number(&self, op: BinOp, line: usize) -> Result<f64, ScriptError> {
        self.as_number().ok_or_else(|| {
            ScriptError::type_mismatch(format!("cannot apply '{}' to non-numeric value \"{}\"", op, self), line)
        })
    }

    /// Applies an arithmetic or comparison operator.
    pub fn binary(op: BinOp, lhs: &Value, rhs: &Value, line: usize) -> Result<Value, ScriptError> {
        if let BinOp::Compare(comparator) = op {
            return Value::compare(comparator, lhs, rhs, line).map(Value::Bool);
        }

        let a = lhs.expect_number(op, line)?;
        let b = rhs.expect_number(op, line)?;
        let result = match op {
            BinOp::Add => a + b,
            BinOp::Subtract => a - b,
            BinOp::Multiply => a * b,
            BinOp::Divide => {
                if b == 0.0 {
                    return Err(ScriptError::DivisionByZero { line });
                }
                a / b
            }
            BinOp::Modulo => {
                if b == 0.0 {
                    return Err(ScriptError::DivisionByZero { line });
                }
                a - b * (a / b).floor()
            }
            BinOp::Compare(_) => unreachable!(),
        };
        Ok(Value::Number(result))
    }

    fn compare(comparator: Comparator, lhs: &Value, rhs: &Value, line: usize) -> Result<bool, ScriptError> {
        if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
            return Ok(match comparator {
                Comparator::Greater => a > b,
                Comparator::Less => a < b,
                Comparator::Equal => a == b,
            });
        }

        match comparator {
            Comparator::Equal => Ok(lhs.as_string() == rhs.as_string()),
            _ => Err(ScriptError::type_mismatch(
                format!(
                    "cannot compare non-numeric values \"{}\" and \"{}\" with '{}'",
                    lhs,
                    rhs,
                    BinOp::Compare(comparator)
                ),
                line,
            )),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Number(a), Value::Text(b)) | (Value::Text(b), Value::Number(a)) => {
                parse_number(b) == Some(*a)
            }
            _ => false,
        }
    }
}
