use super::Module;
use crate::core::Value;
use crate::expr::builtins::expect_args;
use crate::expr::EvalError;

pub fn module() -> Module {
    Module::new("json")
        .with_function("loads", loads)
        .with_function("dumps", dumps)
}

fn loads(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("loads", args, 1, 1, "exactly one")?;
    let text = args[0].as_str().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "the JSON object must be str, not {}",
            args[0].type_name()
        ))
    })?;
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from)
        .map_err(|e| EvalError::Json(e.to_string()))
}

/// NaN and infinities are written as `null`
fn dumps(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("dumps", args, 1, 1, "exactly one")?;
    serde_json::to_string(&serde_json::Value::from(args[0].clone()))
        .map(Value::Str)
        .map_err(|e| EvalError::Json(e.to_string()))
}
