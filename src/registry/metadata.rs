use crate::core::{Block, BlockError, Value};
use serde::{Deserialize, Serialize};

/// Schema for a configurable parameter or factory argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub default: serde_json::Value,
    /// Slot that applies this parameter on a live block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setter: Option<String>,
}

/// Factory function type for creating block instances
pub type BlockFactoryFn = fn(&[Value]) -> Result<Box<dyn Block>, BlockError>;

/// Complete metadata for a block type
#[derive(Clone, Serialize)]
pub struct BlockMetadata {
    pub path: String,
    pub name: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub signals: Vec<String>,
    pub factory_args: Vec<ParameterSchema>,
    pub parameters: Vec<ParameterSchema>,
    #[serde(skip)]
    pub factory: BlockFactoryFn,
}

impl std::fmt::Debug for BlockMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockMetadata")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl BlockMetadata {
    /// Create a new instance of this block type
    pub fn create_instance(&self, args: &[Value]) -> Result<Box<dyn Block>, BlockError> {
        (self.factory)(args)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSchema> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Factory arguments taken from `config`, falling back to declared defaults
    pub fn factory_args_from(&self, config: &serde_json::Value) -> Vec<Value> {
        self.factory_args
            .iter()
            .map(|arg| {
                let json = config.get(&arg.name).unwrap_or(&arg.default);
                Value::from(json.clone())
            })
            .collect()
    }
}

/// Implemented by `#[derive(BlockNode)]`
pub trait DescribeBlock {
    fn metadata() -> BlockMetadata;
}

// Factory type for creating block metadata at runtime
pub type BlockMetadataFactory = fn() -> BlockMetadata;

// Wrapper for inventory collection
pub struct BlockMetadataFactoryWrapper(pub BlockMetadataFactory);

inventory::collect!(BlockMetadataFactoryWrapper);
