//! Sandboxed expression language used by the evaluator block.
//!
//! Expressions are Python flavoured but restricted to a single expression
//! over bound names, builtins and allow-listed modules. There are no
//! statements, no assignment and no dynamic imports.

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interpreter;
pub mod modules;
pub mod ops;
pub mod parser;
pub mod scope;

pub use ast::{BinaryOp, CompareOp, Expr, LogicalOp, UnaryOp};
pub use error::EvalError;
pub use interpreter::evaluate;
pub use modules::{Function, Module, ModuleRegistry, NativeFn};
pub use parser::parse_expression;
pub use scope::{Object, Scope};
