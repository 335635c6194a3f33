use thiserror::Error;

/// Failure while parsing or evaluating an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("invalid syntax at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("name '{0}' is not defined")]
    UndefinedName(String),

    #[error("no module named '{0}'")]
    ModuleNotFound(String),

    #[error("{owner} has no attribute '{name}'")]
    UnknownAttribute { owner: String, name: String },

    #[error("'{0}' object is not callable")]
    NotCallable(String),

    #[error("{0}")]
    TypeMismatch(String),

    #[error("{name}() takes {expected} argument(s) ({found} given)")]
    ArgumentCount {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("division by zero")]
    ZeroDivision,

    #[error("{0} index out of range")]
    IndexOutOfRange(&'static str),

    #[error("key not found: '{0}'")]
    KeyNotFound(String),

    #[error("integer overflow")]
    Overflow,

    #[error("math domain error")]
    MathDomain,

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("json error: {0}")]
    Json(String),

    #[error("expression nested too deeply")]
    TooDeep,

    #[error("expression evaluated to {0}, not a value")]
    NotAValue(String),
}

impl EvalError {
    pub fn type_mismatch<S: Into<String>>(message: S) -> Self {
        EvalError::TypeMismatch(message.into())
    }
}
