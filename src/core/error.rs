use thiserror::Error;

use super::Value;
use crate::expr::EvalError;

/// Errors raised by blocks and the registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    /// A setter received a value of the wrong shape. Nothing was mutated.
    #[error("The given value must be a {expected}. Found {found}")]
    TypeInput {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    #[error("Unknown slot: {0}")]
    UnknownSlot(String),

    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    #[error("Slot {slot} expects {expected} argument(s), got {found}")]
    SlotArity {
        slot: String,
        expected: &'static str,
        found: usize,
    },

    #[error("Unknown block: {0}")]
    UnknownBlock(String),

    #[error("Factory for {path} expects {expected} argument(s), got {found}")]
    FactoryArgs {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BlockError {
    pub fn type_input(expected: &'static str, found: &Value) -> Self {
        BlockError::TypeInput {
            expected,
            found: found.type_name(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        BlockError::Config(message.into())
    }
}
