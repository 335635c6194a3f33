use std::collections::BTreeMap;

use tracing::trace;

use super::ast::{Expr, LogicalOp};
use super::{ops, EvalError, Object, Scope};
use crate::core::Value;

/// Deepest expression tree the interpreter walks. Long operator chains
/// nest as deeply as brackets do.
pub const MAX_EVAL_DEPTH: usize = 200;

/// Evaluate `expr` against `scope`. The result must be a plain value; an
/// expression that evaluates to a module or function is an error.
pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    let result = eval_value(expr, scope, 0);
    trace!(?result, "evaluated expression");
    result
}

fn eval_value(expr: &Expr, scope: &Scope, depth: usize) -> Result<Value, EvalError> {
    eval(expr, scope, depth)?.into_value()
}

fn eval(expr: &Expr, scope: &Scope, depth: usize) -> Result<Object, EvalError> {
    if depth > MAX_EVAL_DEPTH {
        return Err(EvalError::TooDeep);
    }
    let depth = depth + 1;

    match expr {
        Expr::Literal(value) => Ok(Object::Value(value.clone())),

        Expr::Name(name) => scope
            .lookup(name)
            .ok_or_else(|| EvalError::UndefinedName(name.clone())),

        Expr::List(items) => items
            .iter()
            .map(|item| eval_value(item, scope, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(|items| Object::Value(Value::List(items))),

        Expr::Dict(entries) => {
            let mut map = BTreeMap::new();
            for (key, value) in entries {
                let key = match eval_value(key, scope, depth)? {
                    Value::Str(key) => key,
                    other => {
                        return Err(EvalError::type_mismatch(format!(
                            "dict keys must be str, not {}",
                            other.type_name()
                        )))
                    }
                };
                map.insert(key, eval_value(value, scope, depth)?);
            }
            Ok(Object::Value(Value::Map(map)))
        }

        Expr::Unary { op, operand } => {
            ops::unary(*op, &eval_value(operand, scope, depth)?).map(Object::Value)
        }

        Expr::Binary { op, left, right } => {
            let left = eval_value(left, scope, depth)?;
            let right = eval_value(right, scope, depth)?;
            ops::binary(*op, &left, &right).map(Object::Value)
        }

        Expr::Compare { op, left, right } => {
            let left = eval_value(left, scope, depth)?;
            let right = eval_value(right, scope, depth)?;
            ops::compare(*op, &left, &right).map(Object::Value)
        }

        // Short-circuits and yields the deciding operand, not a bool
        Expr::Logical { op, left, right } => {
            let left = eval_value(left, scope, depth)?;
            let decided = match op {
                LogicalOp::And => !left.is_truthy(),
                LogicalOp::Or => left.is_truthy(),
            };
            if decided {
                Ok(Object::Value(left))
            } else {
                eval_value(right, scope, depth).map(Object::Value)
            }
        }

        Expr::Not(operand) => Ok(Object::Value(Value::Bool(
            !eval_value(operand, scope, depth)?.is_truthy(),
        ))),

        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if eval_value(condition, scope, depth)?.is_truthy() {
                eval(then, scope, depth)
            } else {
                eval(otherwise, scope, depth)
            }
        }

        Expr::Attribute { object, name } => match eval(object, scope, depth)? {
            Object::Module(module) => module.member(name),
            other => Err(EvalError::UnknownAttribute {
                owner: format!("'{}' object", other.type_name()),
                name: name.clone(),
            }),
        },

        Expr::Index { object, index } => {
            let object = eval_value(object, scope, depth)?;
            let index = eval_value(index, scope, depth)?;
            ops::index(&object, &index).map(Object::Value)
        }

        Expr::Call { function, args } => {
            let callee = eval(function, scope, depth)?;
            let args = args
                .iter()
                .map(|arg| eval_value(arg, scope, depth))
                .collect::<Result<Vec<_>, _>>()?;
            match callee {
                Object::Function(function) => function.invoke(&args).map(Object::Value),
                other => Err(EvalError::NotCallable(other.type_name().to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{parse_expression, ModuleRegistry};

    fn run(source: &str) -> Result<Value, EvalError> {
        let mut scope = Scope::new();
        scope.bind_module(ModuleRegistry::standard().resolve("math").unwrap());
        scope.bind_value("x", Value::Int(10));
        evaluate(&parse_expression(source)?, &scope)
    }

    #[test]
    fn test_logical_returns_operand() {
        assert_eq!(run("0 or 'fallback'").unwrap(), Value::from("fallback"));
        assert_eq!(run("x and []").unwrap(), Value::List(vec![]));
        // Right side is never evaluated
        assert_eq!(run("False and undefined_name").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_conditional() {
        assert_eq!(run("'big' if x > 5 else 'small'").unwrap(), Value::from("big"));
    }

    #[test]
    fn test_module_is_not_a_value() {
        assert!(matches!(run("math"), Err(EvalError::NotAValue(_))));
        assert!(matches!(run("x.real"), Err(EvalError::UnknownAttribute { .. })));
        assert!(matches!(run("x(1)"), Err(EvalError::NotCallable(_))));
    }

    #[test]
    fn test_long_chain_is_an_error_not_a_crash() {
        let short = vec!["1"; 100].join(" + ");
        assert_eq!(run(&short).unwrap(), Value::Int(100));

        let long = vec!["1"; 5000].join(" + ");
        assert_eq!(run(&long), Err(EvalError::TooDeep));
    }

    #[test]
    fn test_dict_literal() {
        assert_eq!(run("{'a': x}['a'] * 2").unwrap(), Value::Int(20));
    }
}
