use std::collections::HashMap;
use std::sync::Arc;

use super::builtins;
use super::modules::{Function, Module};
use super::EvalError;
use crate::core::Value;

/// Anything a name can resolve to during evaluation
#[derive(Debug, Clone)]
pub enum Object {
    Value(Value),
    Module(Arc<Module>),
    Function(Function),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Value(v) => v.type_name(),
            Object::Module(_) => "module",
            Object::Function(_) => "builtin_function_or_method",
        }
    }

    /// Only plain values can leave the interpreter
    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            Object::Value(v) => Ok(v),
            Object::Module(m) => Err(EvalError::NotAValue(format!("module '{}'", m.name()))),
            Object::Function(f) => Err(EvalError::NotAValue(format!("function '{}'", f.name))),
        }
    }
}

/// Names visible to one evaluation. Builtins are consulted last.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: HashMap<String, Object>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later bindings for the same name replace earlier ones
    pub fn bind(&mut self, name: impl Into<String>, object: Object) {
        self.bindings.insert(name.into(), object);
    }

    pub fn bind_value(&mut self, name: impl Into<String>, value: Value) {
        self.bind(name, Object::Value(value));
    }

    /// Bind a module under its own name
    pub fn bind_module(&mut self, module: Arc<Module>) {
        let name = module.name().to_string();
        self.bind(name, Object::Module(module));
    }

    pub fn lookup(&self, name: &str) -> Option<Object> {
        self.bindings
            .get(name)
            .cloned()
            .or_else(|| builtins::lookup(name).map(Object::Function))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
