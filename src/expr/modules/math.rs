use std::f64::consts;

use super::Module;
use crate::core::Value;
use crate::expr::builtins::{expect_args, float_to_int, real};
use crate::expr::EvalError;

pub fn module() -> Module {
    Module::new("math")
        .with_constant("pi", consts::PI)
        .with_constant("e", consts::E)
        .with_constant("tau", consts::TAU)
        .with_constant("inf", f64::INFINITY)
        .with_constant("nan", f64::NAN)
        .with_function("sqrt", sqrt)
        .with_function("exp", exp)
        .with_function("log", log)
        .with_function("log2", log2)
        .with_function("log10", log10)
        .with_function("pow", pow)
        .with_function("sin", sin)
        .with_function("cos", cos)
        .with_function("tan", tan)
        .with_function("asin", asin)
        .with_function("acos", acos)
        .with_function("atan", atan)
        .with_function("atan2", atan2)
        .with_function("sinh", sinh)
        .with_function("cosh", cosh)
        .with_function("tanh", tanh)
        .with_function("floor", floor)
        .with_function("ceil", ceil)
        .with_function("trunc", trunc)
        .with_function("fabs", fabs)
        .with_function("hypot", hypot)
        .with_function("degrees", degrees)
        .with_function("radians", radians)
        .with_function("isnan", isnan)
        .with_function("isinf", isinf)
        .with_function("isfinite", isfinite)
}

fn one(name: &'static str, args: &[Value]) -> Result<f64, EvalError> {
    expect_args(name, args, 1, 1, "exactly one")?;
    real(&args[0])
}

fn two(name: &'static str, args: &[Value]) -> Result<(f64, f64), EvalError> {
    expect_args(name, args, 2, 2, "exactly two")?;
    Ok((real(&args[0])?, real(&args[1])?))
}

fn apply(name: &'static str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, EvalError> {
    one(name, args).map(|x| Value::Float(f(x)))
}

/// Finite input producing an infinite result
fn range_checked(result: f64, inputs_finite: bool) -> Result<Value, EvalError> {
    if result.is_infinite() && inputs_finite {
        Err(EvalError::Overflow)
    } else {
        Ok(Value::Float(result))
    }
}

fn positive(x: f64) -> Result<f64, EvalError> {
    if x <= 0.0 {
        Err(EvalError::MathDomain)
    } else {
        Ok(x)
    }
}

fn sqrt(args: &[Value]) -> Result<Value, EvalError> {
    let x = one("sqrt", args)?;
    if x < 0.0 {
        return Err(EvalError::MathDomain);
    }
    Ok(Value::Float(x.sqrt()))
}

fn exp(args: &[Value]) -> Result<Value, EvalError> {
    let x = one("exp", args)?;
    range_checked(x.exp(), x.is_finite())
}

fn log(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("log", args, 1, 2, "1 or 2")?;
    let x = positive(real(&args[0])?)?;
    match args.get(1) {
        Some(base) => {
            let base = positive(real(base)?)?;
            if base == 1.0 {
                return Err(EvalError::ZeroDivision);
            }
            Ok(Value::Float(x.ln() / base.ln()))
        }
        None => Ok(Value::Float(x.ln())),
    }
}

fn log2(args: &[Value]) -> Result<Value, EvalError> {
    let x = positive(one("log2", args)?)?;
    Ok(Value::Float(x.log2()))
}

fn log10(args: &[Value]) -> Result<Value, EvalError> {
    let x = positive(one("log10", args)?)?;
    Ok(Value::Float(x.log10()))
}

fn pow(args: &[Value]) -> Result<Value, EvalError> {
    let (x, y) = two("pow", args)?;
    if (x == 0.0 && y < 0.0) || (x < 0.0 && y.is_finite() && y.fract() != 0.0) {
        return Err(EvalError::MathDomain);
    }
    range_checked(x.powf(y), x.is_finite() && y.is_finite())
}

fn sin(args: &[Value]) -> Result<Value, EvalError> {
    apply("sin", args, f64::sin)
}

fn cos(args: &[Value]) -> Result<Value, EvalError> {
    apply("cos", args, f64::cos)
}

fn tan(args: &[Value]) -> Result<Value, EvalError> {
    apply("tan", args, f64::tan)
}

fn asin(args: &[Value]) -> Result<Value, EvalError> {
    let x = one("asin", args)?;
    if !(-1.0..=1.0).contains(&x) {
        return Err(EvalError::MathDomain);
    }
    Ok(Value::Float(x.asin()))
}

fn acos(args: &[Value]) -> Result<Value, EvalError> {
    let x = one("acos", args)?;
    if !(-1.0..=1.0).contains(&x) {
        return Err(EvalError::MathDomain);
    }
    Ok(Value::Float(x.acos()))
}

fn atan(args: &[Value]) -> Result<Value, EvalError> {
    apply("atan", args, f64::atan)
}

fn atan2(args: &[Value]) -> Result<Value, EvalError> {
    let (y, x) = two("atan2", args)?;
    Ok(Value::Float(y.atan2(x)))
}

fn sinh(args: &[Value]) -> Result<Value, EvalError> {
    let x = one("sinh", args)?;
    range_checked(x.sinh(), x.is_finite())
}

fn cosh(args: &[Value]) -> Result<Value, EvalError> {
    let x = one("cosh", args)?;
    range_checked(x.cosh(), x.is_finite())
}

fn tanh(args: &[Value]) -> Result<Value, EvalError> {
    apply("tanh", args, f64::tanh)
}

/// Shared by floor, ceil and trunc: ints pass through, floats become ints
fn to_integral(name: &'static str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, EvalError> {
    expect_args(name, args, 1, 1, "exactly one")?;
    if let Value::Int(i) = &args[0] {
        return Ok(Value::Int(*i));
    }
    float_to_int(f(real(&args[0])?))
}

fn floor(args: &[Value]) -> Result<Value, EvalError> {
    to_integral("floor", args, f64::floor)
}

fn ceil(args: &[Value]) -> Result<Value, EvalError> {
    to_integral("ceil", args, f64::ceil)
}

fn trunc(args: &[Value]) -> Result<Value, EvalError> {
    to_integral("trunc", args, f64::trunc)
}

fn fabs(args: &[Value]) -> Result<Value, EvalError> {
    apply("fabs", args, f64::abs)
}

fn hypot(args: &[Value]) -> Result<Value, EvalError> {
    let (x, y) = two("hypot", args)?;
    range_checked(x.hypot(y), x.is_finite() && y.is_finite())
}

fn degrees(args: &[Value]) -> Result<Value, EvalError> {
    apply("degrees", args, f64::to_degrees)
}

fn radians(args: &[Value]) -> Result<Value, EvalError> {
    apply("radians", args, f64::to_radians)
}

fn isnan(args: &[Value]) -> Result<Value, EvalError> {
    one("isnan", args).map(|x| Value::Bool(x.is_nan()))
}

fn isinf(args: &[Value]) -> Result<Value, EvalError> {
    one("isinf", args).map(|x| Value::Bool(x.is_infinite()))
}

fn isfinite(args: &[Value]) -> Result<Value, EvalError> {
    one("isfinite", args).map(|x| Value::Bool(x.is_finite()))
}
