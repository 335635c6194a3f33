use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::blocks::Evaluator;
use crate::core::Value;
use crate::observability::LogConfig;
use crate::resilience::ErrorPolicy;

fn default_imports() -> Vec<String> {
    vec!["math".to_string()]
}

fn default_args() -> Vec<String> {
    vec!["val".to_string()]
}

fn default_expr() -> String {
    "math.log2(val)".to_string()
}

fn default_inbox_capacity() -> usize {
    100
}

/// Construction and parameters of an evaluator block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorConfig {
    #[serde(default = "default_imports")]
    pub imports: Vec<String>,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_expr")]
    pub expr: String,
    #[serde(default)]
    pub local_vars: BTreeMap<String, Value>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            imports: default_imports(),
            args: default_args(),
            expr: default_expr(),
            local_vars: BTreeMap::new(),
        }
    }
}

impl EvaluatorConfig {
    pub fn from_json(config: serde_json::Value) -> Result<Self> {
        serde_json::from_value(config).context("Invalid evaluator configuration")
    }

    /// Build an evaluator with every parameter applied
    pub fn build(&self) -> Result<Evaluator> {
        let mut evaluator = Evaluator::new(self.args.clone())?;
        evaluator.set_imports(self.imports.clone())?;
        evaluator.set_local_vars(self.local_vars.clone())?;
        evaluator.set_expression(self.expr.as_str())?;
        Ok(evaluator)
    }
}

/// How a block is hosted by a [`BlockActor`](crate::engine::BlockActor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    #[serde(default)]
    pub logging: LogConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: default_inbox_capacity(),
            error_policy: ErrorPolicy::default(),
            logging: LogConfig::default(),
        }
    }
}

impl HostConfig {
    pub fn from_json(config: serde_json::Value) -> Result<Self> {
        let config: Self =
            serde_json::from_value(config).context("Invalid host configuration")?;
        if config.inbox_capacity == 0 {
            anyhow::bail!("inbox_capacity must be at least 1");
        }
        Ok(config)
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }
}
