use slotflow::blocks::Evaluator;
use slotflow::core::{Block, BlockError, Signals, Value};
use slotflow::registry::{BlockMetadata, BlockMetadataFactoryWrapper, BlockRegistry, DescribeBlock};

#[test]
fn test_inventory_collects_evaluator() {
    let mut blocks: Vec<BlockMetadata> = Vec::new();
    for wrapper in inventory::iter::<BlockMetadataFactoryWrapper> {
        blocks.push((wrapper.0)());
    }

    let registry = BlockRegistry::collect();
    assert!(registry.len() >= blocks.len());
    assert!(registry.get("/blocks/evaluator").is_some(), "Evaluator not found");
}

#[test]
fn test_evaluator_metadata_has_correct_structure() {
    let meta = Evaluator::metadata();

    assert_eq!(meta.path, "/blocks/evaluator");
    assert_eq!(meta.name, "Evaluator");
    assert_eq!(meta.category, "/Event");
    assert_eq!(meta.keywords, vec!["signal", "slot", "eval", "expression"]);
    assert_eq!(meta.signals, vec!["triggered"]);

    assert_eq!(meta.factory_args.len(), 1);
    assert_eq!(meta.factory_args[0].name, "args");
    assert_eq!(meta.factory_args[0].default, serde_json::json!(["val"]));

    let names: Vec<&str> = meta.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["imports", "localVars", "expr"]);

    let expr = meta.parameter("expr").expect("expr parameter not found");
    assert_eq!(expr.param_type, "string");
    assert_eq!(expr.default, serde_json::json!("math.log2(val)"));
    assert_eq!(expr.setter.as_deref(), Some("setExpression"));

    let imports = meta.parameter("imports").expect("imports parameter not found");
    assert_eq!(imports.param_type, "list");
    assert_eq!(imports.default, serde_json::json!(["math"]));

    let local_vars = meta.parameter("localVars").expect("localVars parameter not found");
    assert_eq!(local_vars.param_type, "dict");
    assert_eq!(local_vars.default, serde_json::json!({}));
}

#[test]
fn test_metadata_serializes_without_factory() {
    let json = serde_json::to_value(Evaluator::metadata()).unwrap();
    assert_eq!(json["path"], "/blocks/evaluator");
    assert_eq!(json["parameters"][0]["type"], "list");
    assert!(json.get("factory").is_none());
}

#[test]
fn test_make_with_positional_args() {
    let registry = BlockRegistry::collect();
    let block = registry
        .make("/blocks/evaluator", &[Value::from(vec!["x", "y"])])
        .unwrap();

    assert_eq!(block.path(), "/blocks/evaluator");
    assert!(block.slots().contains(&"setY".to_string()));
}

#[test]
fn test_make_checks_factory_arity() {
    let registry = BlockRegistry::collect();
    let err = registry.make("/blocks/evaluator", &[]).err().unwrap();
    assert_eq!(
        err,
        BlockError::FactoryArgs {
            path: "/blocks/evaluator".to_string(),
            expected: 1,
            found: 0
        }
    );
}

#[test]
fn test_make_unknown_block() {
    let registry = BlockRegistry::collect();
    let err = registry.make("/blocks/missing", &[]).err().unwrap();
    assert_eq!(err, BlockError::UnknownBlock("/blocks/missing".to_string()));
}

#[test]
fn test_make_with_config_applies_defaults() {
    let registry = BlockRegistry::collect();
    let mut block = registry
        .make_with_config("/blocks/evaluator", &serde_json::json!({}))
        .unwrap();

    let mut signals = Signals::new();
    block.call_slot("setVal", vec![Value::Int(8)], &mut signals).unwrap();

    assert_eq!(signals.emitted("triggered"), vec![&[Value::Float(3.0)][..]]);
}

#[test]
fn test_make_with_config_overrides() {
    let registry = BlockRegistry::collect();
    let config = serde_json::json!({
        "args": ["a"],
        "imports": [],
        "localVars": {"offset": 2},
        "expr": "a + offset"
    });
    let mut block = registry
        .make_with_config("/blocks/evaluator", &config)
        .unwrap();

    let mut signals = Signals::new();
    block.call_slot("setA", vec![Value::Int(1)], &mut signals).unwrap();

    assert_eq!(signals.emitted("triggered"), vec![&[Value::Int(3)][..]]);
}

#[test]
fn test_make_with_config_rejects_bad_parameter() {
    let registry = BlockRegistry::collect();
    let config = serde_json::json!({ "imports": 5 });

    let err = registry
        .make_with_config("/blocks/evaluator", &config)
        .err()
        .unwrap();
    let cause = err.downcast_ref::<BlockError>().expect("BlockError cause");
    assert!(matches!(cause, BlockError::TypeInput { .. }));
}
