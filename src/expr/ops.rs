//! Python semantics for operators over [`Value`]s.

use std::cmp::Ordering;

use super::ast::{BinaryOp, CompareOp, UnaryOp};
use super::EvalError;
use crate::core::Value;

/// Upper bound on the length of a sequence built by `*` repetition
const MAX_REPEAT_LEN: usize = 1 << 24;

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::Bool(b) => Some(Number::Int(*b as i64)),
        Value::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    match (op, number(operand)) {
        (UnaryOp::Neg, Some(Number::Int(i))) => {
            i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow)
        }
        (UnaryOp::Neg, Some(Number::Float(f))) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Some(Number::Int(i))) => Ok(Value::Int(i)),
        (UnaryOp::Pos, Some(Number::Float(f))) => Ok(Value::Float(f)),
        (_, None) => {
            let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
            Err(EvalError::type_mismatch(format!(
                "bad operand type for unary {}: '{}'",
                symbol,
                operand.type_name()
            )))
        }
    }
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            return Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Mul, Value::Str(_) | Value::List(_), count)
        | (BinaryOp::Mul, count, Value::Str(_) | Value::List(_))
            if count.as_i64().is_some() =>
        {
            let sequence = if matches!(left, Value::Str(_) | Value::List(_)) { left } else { right };
            return repeat(sequence, count.as_i64().unwrap_or(0));
        }
        _ => {}
    }

    match (number(left), number(right)) {
        (Some(Number::Int(a)), Some(Number::Int(b))) => int_arith(op, a, b),
        (Some(a), Some(b)) => float_arith(op, a.as_f64(), b.as_f64()),
        _ => Err(EvalError::type_mismatch(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn repeat(sequence: &Value, count: i64) -> Result<Value, EvalError> {
    let count = usize::try_from(count).unwrap_or(0);
    let len = match sequence {
        Value::Str(s) => s.len(),
        Value::List(items) => items.len(),
        _ => 0,
    };
    if len.saturating_mul(count) > MAX_REPEAT_LEN {
        return Err(EvalError::Overflow);
    }
    Ok(match sequence {
        Value::Str(s) => Value::Str(s.repeat(count)),
        Value::List(items) => Value::List(
            std::iter::repeat(items.iter())
                .take(count)
                .flatten()
                .cloned()
                .collect(),
        ),
        other => other.clone(),
    })
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let checked = |result: Option<i64>| result.map(Value::Int).ok_or(EvalError::Overflow);
    match op {
        BinaryOp::Add => checked(a.checked_add(b)),
        BinaryOp::Sub => checked(a.checked_sub(b)),
        BinaryOp::Mul => checked(a.checked_mul(b)),
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            let quotient = a.checked_div(b).ok_or(EvalError::Overflow)?;
            // Round toward negative infinity
            if (a % b != 0) && ((a < 0) != (b < 0)) {
                Ok(Value::Int(quotient - 1))
            } else {
                Ok(Value::Int(quotient))
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            let rem = a.checked_rem(b).ok_or(EvalError::Overflow)?;
            // Result takes the sign of the divisor
            if rem != 0 && ((rem < 0) != (b < 0)) {
                Ok(Value::Int(rem + b))
            } else {
                Ok(Value::Int(rem))
            }
        }
        BinaryOp::Pow => {
            if b >= 0 {
                // Bases whose powers stay bounded whatever the exponent
                match a {
                    0 | 1 => return Ok(Value::Int(if b == 0 { 1 } else { a })),
                    -1 => return Ok(Value::Int(if b % 2 == 0 { 1 } else { -1 })),
                    _ => {}
                }
                u32::try_from(b)
                    .ok()
                    .and_then(|exp| a.checked_pow(exp))
                    .map(Value::Int)
                    .ok_or(EvalError::Overflow)
            } else {
                float_arith(op, a as f64, b as f64)
            }
        }
    }
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(EvalError::ZeroDivision);
            }
            a / b
        }
        BinaryOp::FloorDiv => {
            if b == 0.0 {
                return Err(EvalError::ZeroDivision);
            }
            (a / b).floor()
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::ZeroDivision);
            }
            let rem = a % b;
            if rem != 0.0 && ((rem < 0.0) != (b < 0.0)) {
                rem + b
            } else {
                rem
            }
        }
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(EvalError::ZeroDivision);
            }
            if a < 0.0 && b.is_finite() && b.fract() != 0.0 {
                return Err(EvalError::MathDomain);
            }
            let result = a.powf(b);
            if result.is_infinite() && a.is_finite() && b.is_finite() {
                return Err(EvalError::Overflow);
            }
            result
        }
    };
    Ok(Value::Float(result))
}

/// Value equality. Numbers compare across int, float and bool.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| equals(x, y)))
        }
        _ => match (number(left), number(right)) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
            (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
            _ => false,
        },
    }
}

/// Ordering of two values; `None` when either side is NaN
pub fn order(left: &Value, right: &Value, symbol: &str) -> Result<Option<Ordering>, EvalError> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                if !equals(x, y) {
                    return order(x, y, symbol);
                }
            }
            Ok(Some(a.len().cmp(&b.len())))
        }
        _ => match (number(left), number(right)) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => Ok(Some(a.cmp(&b))),
            (Some(a), Some(b)) => Ok(a.as_f64().partial_cmp(&b.as_f64())),
            _ => Err(EvalError::type_mismatch(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                symbol,
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

pub fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let result = match op {
        CompareOp::Eq => equals(left, right),
        CompareOp::Ne => !equals(left, right),
        CompareOp::Lt => order(left, right, op.symbol())? == Some(Ordering::Less),
        CompareOp::Le => matches!(
            order(left, right, op.symbol())?,
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => order(left, right, op.symbol())? == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            order(left, right, op.symbol())?,
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
    };
    Ok(Value::Bool(result))
}

/// Membership test: list element, substring, or dict key
pub fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match (container, item) {
        (Value::List(items), _) => Ok(items.iter().any(|x| equals(x, item))),
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Str(_), other) => Err(EvalError::type_mismatch(format!(
            "'in <string>' requires string as left operand, not {}",
            other.type_name()
        ))),
        (Value::Map(entries), Value::Str(key)) => Ok(entries.contains_key(key)),
        (Value::Map(_), _) => Ok(false),
        (other, _) => Err(EvalError::type_mismatch(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Subscript with Python's negative index support
pub fn index(object: &Value, key: &Value) -> Result<Value, EvalError> {
    match (object, key) {
        (Value::List(items), _) if key.as_i64().is_some() => {
            let position = normalize(key.as_i64().unwrap_or(0), items.len())
                .ok_or(EvalError::IndexOutOfRange("list"))?;
            Ok(items[position].clone())
        }
        (Value::Str(s), _) if key.as_i64().is_some() => {
            let position = normalize(key.as_i64().unwrap_or(0), s.chars().count())
                .ok_or(EvalError::IndexOutOfRange("string"))?;
            Ok(s.chars()
                .nth(position)
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or_default())
        }
        (Value::List(_) | Value::Str(_), _) => Err(EvalError::type_mismatch(format!(
            "{} indices must be integers, not {}",
            object.type_name(),
            key.type_name()
        ))),
        (Value::Map(entries), Value::Str(name)) => entries
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::KeyNotFound(name.clone())),
        (Value::Map(_), other) => Err(EvalError::KeyNotFound(other.repr())),
        (other, _) => Err(EvalError::type_mismatch(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn normalize(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let position = if index < 0 { index + len } else { index };
    if (0..len).contains(&position) {
        usize::try_from(position).ok()
    } else {
        None
    }
}
