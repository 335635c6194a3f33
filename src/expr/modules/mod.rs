//! Allow-listed modules that expressions may import.

mod json;
mod math;

use std::collections::HashMap;
use std::sync::Arc;

use super::{EvalError, Object};
use crate::core::Value;

/// Native implementation of a callable
pub type NativeFn = fn(&[Value]) -> Result<Value, EvalError>;

#[derive(Clone, Copy)]
pub struct Function {
    pub name: &'static str,
    pub call: NativeFn,
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Function {
    pub fn new(name: &'static str, call: NativeFn) -> Self {
        Self { name, call }
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.call)(args)
    }
}

/// Named bag of functions and constants, reached through attribute access
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    members: HashMap<String, Object>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: HashMap::new(),
        }
    }

    pub fn with_function(mut self, name: &'static str, call: NativeFn) -> Self {
        self.members
            .insert(name.to_string(), Object::Function(Function::new(name, call)));
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), Object::Value(value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, name: &str) -> Result<Object, EvalError> {
        self.members
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownAttribute {
                owner: format!("module '{}'", self.name),
                name: name.to_string(),
            })
    }

    pub fn member_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.members.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Modules that can be named in an import list
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<Module>>,
}

impl ModuleRegistry {
    /// Registry with no modules at all
    pub fn empty() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// `math` and `json`
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(math::module());
        registry.register(json::module());
        registry
    }

    pub fn register(&mut self, module: Module) {
        self.modules
            .insert(module.name().to_string(), Arc::new(module));
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<Module>, EvalError> {
        self.modules
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::ModuleNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_modules() {
        let registry = ModuleRegistry::standard();
        assert_eq!(registry.names(), vec!["json", "math"]);
        assert!(registry.resolve("os").is_err());
    }

    #[test]
    fn test_unknown_member() {
        let math = ModuleRegistry::standard().resolve("math").unwrap();
        let err = math.member("nope").unwrap_err();
        assert_eq!(err.to_string(), "module 'math' has no attribute 'nope'");
    }
}
