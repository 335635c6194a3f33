//! Functions available to every expression without an import.

use super::modules::{Function, NativeFn};
use super::{ops, BinaryOp, EvalError};
use crate::core::Value;
use std::cmp::Ordering;

const BUILTINS: &[(&str, NativeFn)] = &[
    ("abs", abs),
    ("bool", bool_),
    ("float", float),
    ("int", int),
    ("len", len),
    ("max", max),
    ("min", min),
    ("pow", pow),
    ("round", round),
    ("str", str_),
    ("sum", sum),
];

pub fn lookup(name: &str) -> Option<Function> {
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(builtin, call)| Function::new(*builtin, *call))
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, _)| *name)
}

pub(crate) fn expect_args(
    name: &str,
    args: &[Value],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), EvalError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(EvalError::ArgumentCount {
            name: name.to_string(),
            expected,
            found: args.len(),
        })
    }
}

/// Numeric argument as a float
pub(crate) fn real(value: &Value) -> Result<f64, EvalError> {
    value.as_f64().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "must be real number, not {}",
            value.type_name()
        ))
    })
}

/// Convert an already integral float, rejecting NaN and out of range values
pub(crate) fn float_to_int(x: f64) -> Result<Value, EvalError> {
    if x.is_nan() {
        return Err(EvalError::InvalidValue(
            "cannot convert float NaN to integer".to_string(),
        ));
    }
    // 2^63 is the first float past i64::MAX
    if x.is_infinite() || !(-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&x) {
        return Err(EvalError::Overflow);
    }
    Ok(Value::Int(x as i64))
}

fn abs(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("abs", args, 1, 1, "exactly one")?;
    match &args[0] {
        Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(EvalError::Overflow),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(EvalError::type_mismatch(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

fn bool_(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("bool", args, 0, 1, "at most 1")?;
    Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
}

fn float(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("float", args, 0, 1, "at most 1")?;
    match args.first() {
        None => Ok(Value::Float(0.0)),
        Some(Value::Str(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| EvalError::InvalidValue(format!("could not convert string to float: '{}'", s))),
        Some(other) => real(other).map(Value::Float),
    }
}

fn int(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("int", args, 0, 1, "at most 1")?;
    match args.first() {
        None => Ok(Value::Int(0)),
        Some(Value::Int(i)) => Ok(Value::Int(*i)),
        Some(Value::Bool(b)) => Ok(Value::Int(*b as i64)),
        Some(Value::Float(f)) => float_to_int(f.trunc()),
        Some(Value::Str(s)) => s
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| EvalError::InvalidValue(format!("invalid literal for int(): '{}'", s))),
        Some(other) => Err(EvalError::type_mismatch(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn len(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("len", args, 1, 1, "exactly one")?;
    let count = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(entries) => entries.len(),
        other => {
            return Err(EvalError::type_mismatch(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    i64::try_from(count).map(Value::Int).map_err(|_| EvalError::Overflow)
}

/// `min`/`max` over either one list argument or several positional ones
fn extremum(name: &'static str, args: &[Value], wanted: Ordering) -> Result<Value, EvalError> {
    let items = match args {
        [] => {
            return Err(EvalError::ArgumentCount {
                name: name.to_string(),
                expected: "at least 1",
                found: 0,
            })
        }
        [Value::List(items)] => items.as_slice(),
        _ => args,
    };
    let mut iter = items.iter();
    let mut best = iter
        .next()
        .ok_or_else(|| EvalError::InvalidValue(format!("{}() arg is an empty sequence", name)))?;
    let symbol = if wanted == Ordering::Less { "<" } else { ">" };
    for item in iter {
        if ops::order(item, best, symbol)? == Some(wanted) {
            best = item;
        }
    }
    Ok(best.clone())
}

fn max(args: &[Value]) -> Result<Value, EvalError> {
    extremum("max", args, Ordering::Greater)
}

fn min(args: &[Value]) -> Result<Value, EvalError> {
    extremum("min", args, Ordering::Less)
}

fn pow(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("pow", args, 2, 2, "exactly two")?;
    ops::binary(BinaryOp::Pow, &args[0], &args[1])
}

/// Rounds half to even, like Python
fn round(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("round", args, 1, 2, "1 or 2")?;
    let digits = match args.get(1) {
        None | Some(Value::None) => None,
        Some(value) => Some(value.as_i64().ok_or_else(|| {
            EvalError::type_mismatch(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?),
    };

    match (&args[0], digits) {
        (Value::Int(i), None) => Ok(Value::Int(*i)),
        (Value::Bool(b), None) => Ok(Value::Int(*b as i64)),
        (Value::Float(f), None) => float_to_int(f.round_ties_even()),
        (Value::Int(i), Some(n)) if n >= 0 => Ok(Value::Int(*i)),
        (Value::Int(i), Some(n)) => {
            let scale = 10f64.powi(i32::try_from(-n).unwrap_or(i32::MAX));
            float_to_int((*i as f64 / scale).round_ties_even() * scale)
        }
        (Value::Float(f), Some(n)) => {
            let scale = 10f64.powi(i32::try_from(n).unwrap_or(if n > 0 { i32::MAX } else { i32::MIN }));
            let scaled = f * scale;
            if !scaled.is_finite() {
                return Ok(Value::Float(*f));
            }
            Ok(Value::Float(scaled.round_ties_even() / scale))
        }
        (other, _) => Err(EvalError::type_mismatch(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

fn str_(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("str", args, 0, 1, "at most 1")?;
    Ok(Value::Str(
        args.first().map(ToString::to_string).unwrap_or_default(),
    ))
}

fn sum(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("sum", args, 1, 2, "1 or 2")?;
    let items = args[0].as_list().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "'{}' object is not iterable",
            args[0].type_name()
        ))
    })?;
    let start = args.get(1).cloned().unwrap_or(Value::Int(0));
    items
        .iter()
        .try_fold(start, |total, item| ops::binary(BinaryOp::Add, &total, item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_even() {
        assert_eq!(round(&[Value::Float(2.5)]).unwrap(), Value::Int(2));
        assert_eq!(round(&[Value::Float(3.5)]).unwrap(), Value::Int(4));
        assert_eq!(
            round(&[Value::Float(1.2345), Value::Int(2)]).unwrap(),
            Value::Float(1.23)
        );
        assert_eq!(round(&[Value::Int(1250), Value::Int(-2)]).unwrap(), Value::Int(1200));
    }

    #[test]
    fn test_min_max_forms() {
        let list = Value::from(vec![3, 1, 2]);
        assert_eq!(min(&[list.clone()]).unwrap(), Value::Int(1));
        assert_eq!(max(&[Value::Int(3), Value::Float(4.5)]).unwrap(), Value::Float(4.5));
        assert!(matches!(
            max(&[Value::List(vec![])]),
            Err(EvalError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_int_parsing() {
        assert_eq!(int(&[Value::from(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(int(&[Value::Float(-2.7)]).unwrap(), Value::Int(-2));
        assert!(int(&[Value::from("4.2")]).is_err());
    }

    #[test]
    fn test_argument_count() {
        let err = len(&[]).unwrap_err();
        assert_eq!(err.to_string(), "len() takes exactly one argument(s) (0 given)");
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("abs").is_some());
        assert!(lookup("eval").is_none());
        assert!(names().any(|n| n == "sum"));
    }
}
