pub mod metadata;

pub use metadata::{
    BlockFactoryFn, BlockMetadata, BlockMetadataFactory, BlockMetadataFactoryWrapper,
    DescribeBlock, ParameterSchema,
};

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::{debug, trace};

use crate::blocks::Evaluator;
use crate::core::{Block, BlockError, Signals, Value};

/// Block types by registry path
#[derive(Debug, Default, Clone)]
pub struct BlockRegistry {
    blocks: BTreeMap<String, BlockMetadata>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in blocks plus everything submitted
    /// through `inventory`
    pub fn collect() -> Self {
        let mut registry = Self::new();
        registry.register(Evaluator::metadata());
        for wrapper in inventory::iter::<BlockMetadataFactoryWrapper> {
            registry.register((wrapper.0)());
        }
        debug!(blocks = registry.blocks.len(), "collected block registry");
        registry
    }

    /// Later registrations for the same path replace earlier ones
    pub fn register(&mut self, metadata: BlockMetadata) {
        self.blocks.insert(metadata.path.clone(), metadata);
    }

    pub fn get(&self, path: &str) -> Option<&BlockMetadata> {
        self.blocks.get(path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.blocks.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn metadata(&self, path: &str) -> Result<&BlockMetadata, BlockError> {
        self.get(path)
            .ok_or_else(|| BlockError::UnknownBlock(path.to_string()))
    }

    /// Build a block from positional factory arguments
    pub fn make(&self, path: &str, args: &[Value]) -> Result<Box<dyn Block>, BlockError> {
        self.metadata(path)?.create_instance(args)
    }

    /// Build a block from a JSON object holding factory arguments and
    /// parameters. Parameters are applied through their setter slots in
    /// declaration order; missing keys take the declared default.
    pub fn make_with_config(&self, path: &str, config: &serde_json::Value) -> Result<Box<dyn Block>> {
        if !(config.is_object() || config.is_null()) {
            return Err(BlockError::config(format!("expected a JSON object, found {}", config)))
                .with_context(|| format!("configuring {}", path));
        }
        let metadata = self.metadata(path)?;
        let args = metadata.factory_args_from(config);
        let mut block = metadata
            .create_instance(&args)
            .with_context(|| format!("creating {}", path))?;

        let mut signals = Signals::new();
        for param in &metadata.parameters {
            let Some(setter) = &param.setter else {
                continue;
            };
            let value = config.get(&param.name).unwrap_or(&param.default);
            block
                .call_slot(setter, vec![Value::from(value.clone())], &mut signals)
                .with_context(|| format!("applying parameter '{}' to {}", param.name, path))?;
        }
        if !signals.is_empty() {
            trace!(path, emitted = signals.len(), "dropping signals emitted during configuration");
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluator_is_builtin() {
        let registry = BlockRegistry::collect();
        assert!(registry.paths().contains(&"/blocks/evaluator"));
    }

    #[test]
    fn test_unknown_path() {
        let registry = BlockRegistry::new();
        assert!(matches!(
            registry.make("/blocks/nope", &[]),
            Err(BlockError::UnknownBlock(_))
        ));
    }
}
