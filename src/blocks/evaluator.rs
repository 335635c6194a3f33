use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use slotflow_macros::BlockNode;
use tracing::{debug, trace};

use crate::core::{Block, BlockError, BlockFactory, Signals, Value};
use crate::expr::{evaluate, parse_expression, EvalError, Expr, ModuleRegistry, Scope};

pub const PATH: &str = "/blocks/evaluator";
pub const TRIGGERED: &str = "triggered";
pub const SET_EXPRESSION: &str = "setExpression";
pub const SET_IMPORTS: &str = "setImports";
pub const SET_LOCAL_VARS: &str = "setLocalVars";

/// What a slot does when invoked
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotHandler {
    Variable(String),
    Expression,
    Imports,
    LocalVars,
}

/// Slot that binds variable `name`: `val` becomes `setVal`
pub fn slot_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => "set".to_string(),
    }
}

/// Evaluates an expression over named inputs and emits the result.
///
/// Every declared variable gets a `set<Name>` slot. Once each of them has
/// received at least one event, any further variable event (or a new
/// expression) evaluates the expression and emits `triggered(result)`.
/// A slot event carrying several arguments binds `name0`, `name1`, ...
/// instead of `name`.
#[derive(BlockNode, Debug, Clone)]
#[block_meta(
    path = "/blocks/evaluator",
    name = "Evaluator",
    category = "/Event",
    keywords = "signal slot eval expression",
    signals = "triggered"
)]
pub struct Evaluator {
    #[factory_arg(name = "args", default = r#"["val"]"#)]
    var_names: Vec<String>,

    #[param(default = r#"["math"]"#, setter = "setImports")]
    imports: Vec<String>,

    #[param(name = "localVars", default = "{}", setter = "setLocalVars")]
    local_vars: BTreeMap<String, Value>,

    #[param(default = r#""math.log2(val)""#, setter = "setExpression")]
    expr: String,

    parsed: Result<Expr, EvalError>,
    slots: Vec<(String, SlotHandler)>,
    bindings: BTreeMap<String, Value>,
    ready: HashSet<String>,
    modules: ModuleRegistry,
}

impl Evaluator {
    /// Build an evaluator from a list of variable names.
    ///
    /// Empty names are skipped and repeated names share one slot.
    pub fn new(var_names: impl Into<Value>) -> Result<Self, BlockError> {
        let var_names = var_names.into();
        let items = var_names
            .as_list()
            .ok_or_else(|| BlockError::type_input("list", &var_names))?;

        let mut names: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let name = item
                .as_str()
                .ok_or_else(|| BlockError::type_input("str", item))?;
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        let mut slots: Vec<(String, SlotHandler)> = vec![
            (SET_EXPRESSION.to_string(), SlotHandler::Expression),
            (SET_IMPORTS.to_string(), SlotHandler::Imports),
            (SET_LOCAL_VARS.to_string(), SlotHandler::LocalVars),
        ];
        for name in &names {
            let slot = slot_name(name);
            if slots.iter().any(|(existing, _)| *existing == slot) {
                return Err(BlockError::config(format!(
                    "variable '{}' collides with slot '{}'",
                    name, slot
                )));
            }
            slots.push((slot, SlotHandler::Variable(name.clone())));
        }

        Ok(Self {
            var_names: names,
            imports: Vec::new(),
            local_vars: BTreeMap::new(),
            expr: String::new(),
            parsed: parse_expression(""),
            slots,
            bindings: BTreeMap::new(),
            ready: HashSet::new(),
            modules: ModuleRegistry::standard(),
        })
    }

    /// Replace the table of importable modules
    pub fn with_modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = modules;
        self
    }

    pub fn expression(&self) -> &str {
        &self.expr
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn local_vars(&self) -> &BTreeMap<String, Value> {
        &self.local_vars
    }

    pub fn variable_names(&self) -> &[String] {
        &self.var_names
    }

    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }

    /// True once every declared variable has received an event
    pub fn is_ready(&self) -> bool {
        self.ready.len() == self.var_names.len()
    }

    /// Declared variables still waiting for their first event
    pub fn pending_variables(&self) -> Vec<&str> {
        self.var_names
            .iter()
            .filter(|name| !self.ready.contains(*name))
            .map(String::as_str)
            .collect()
    }

    /// Bind the arguments of one event for variable `name`.
    ///
    /// Returns the new result when the event completed the inputs (or they
    /// were already complete) and an expression is set.
    pub fn set_variable(&mut self, name: &str, args: Vec<Value>) -> Result<Option<Value>, BlockError> {
        if !self.var_names.iter().any(|n| n == name) {
            return Err(BlockError::UnknownSlot(slot_name(name)));
        }
        match args.len() {
            0 => {
                return Err(BlockError::SlotArity {
                    slot: slot_name(name),
                    expected: "at least 1",
                    found: 0,
                })
            }
            1 => {
                let value = args.into_iter().next().unwrap_or_default();
                self.bindings.insert(name.to_string(), value);
            }
            _ => {
                for (i, value) in args.into_iter().enumerate() {
                    self.bindings.insert(format!("{}{}", name, i), value);
                }
            }
        }
        self.ready.insert(name.to_string());

        if self.is_ready() && !self.expr.is_empty() {
            self.evaluate().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Replace the expression, evaluating it right away when all inputs are bound
    pub fn set_expression(&mut self, expr: impl Into<Value>) -> Result<Option<Value>, BlockError> {
        let expr = match expr.into() {
            Value::Str(expr) => expr,
            other => return Err(BlockError::type_input("str", &other)),
        };
        self.parsed = parse_expression(&expr);
        self.expr = expr;

        if self.is_ready() && !self.expr.is_empty() {
            self.evaluate().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Replace the import list. A single string imports one module.
    pub fn set_imports(&mut self, imports: impl Into<Value>) -> Result<(), BlockError> {
        let imports = match imports.into() {
            Value::Str(module) => vec![module],
            Value::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Str(module) => Ok(module),
                    other => Err(BlockError::type_input("str", &other)),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(BlockError::type_input("list", &other)),
        };
        self.imports = imports;
        Ok(())
    }

    pub fn set_local_vars(&mut self, local_vars: impl Into<Value>) -> Result<(), BlockError> {
        match local_vars.into() {
            Value::Map(entries) => {
                self.local_vars = entries;
                Ok(())
            }
            other => Err(BlockError::type_input("dict", &other)),
        }
    }

    /// Evaluate the current expression against bindings, imports and local vars
    pub fn evaluate(&self) -> Result<Value, BlockError> {
        let expr = self.parsed.as_ref().map_err(Clone::clone)?;

        let mut scope = Scope::new();
        for (name, value) in &self.bindings {
            scope.bind_value(name.clone(), value.clone());
        }
        for module in &self.imports {
            scope.bind_module(self.modules.resolve(module)?);
        }
        for (name, value) in &self.local_vars {
            scope.bind_value(name.clone(), value.clone());
        }

        let result = evaluate(expr, &scope)?;
        debug!(expr = %self.expr, %result, "evaluated expression");
        Ok(result)
    }

    fn handler(&self, slot: &str) -> Option<&SlotHandler> {
        self.slots
            .iter()
            .find(|(name, _)| name == slot)
            .map(|(_, handler)| handler)
    }

    /// Apply the parameter keys present in a JSON object
    fn apply_config(&mut self, config: &serde_json::Value) -> Result<(), BlockError> {
        let entries = match config {
            serde_json::Value::Null => return Ok(()),
            serde_json::Value::Object(entries) => entries,
            other => {
                return Err(BlockError::config(format!(
                    "expected a JSON object, found {}",
                    other
                )))
            }
        };
        if let Some(imports) = entries.get("imports") {
            self.set_imports(Value::from(imports.clone()))?;
        }
        if let Some(local_vars) = entries.get("localVars") {
            self.set_local_vars(Value::from(local_vars.clone()))?;
        }
        if let Some(expr) = entries.get("expr") {
            self.set_expression(Value::from(expr.clone()))?;
        }
        Ok(())
    }
}

fn single_arg(slot: &str, args: Vec<Value>) -> Result<Value, BlockError> {
    let found = args.len();
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(BlockError::SlotArity {
            slot: slot.to_string(),
            expected: "exactly 1",
            found,
        }),
    }
}

impl BlockFactory for Evaluator {
    fn create(args: &[Value]) -> Result<Self, BlockError> {
        match args {
            [var_names] => Evaluator::new(var_names.clone()),
            _ => Err(BlockError::FactoryArgs {
                path: PATH.to_string(),
                expected: 1,
                found: args.len(),
            }),
        }
    }
}

#[async_trait]
impl Block for Evaluator {
    fn path(&self) -> &str {
        PATH
    }

    fn slots(&self) -> Vec<String> {
        self.slots.iter().map(|(name, _)| name.clone()).collect()
    }

    fn signals(&self) -> Vec<String> {
        vec![TRIGGERED.to_string()]
    }

    fn call_slot(&mut self, slot: &str, args: Vec<Value>, signals: &mut Signals) -> Result<(), BlockError> {
        trace!(slot, args = args.len(), "dispatching slot");
        let handler = self
            .handler(slot)
            .cloned()
            .ok_or_else(|| BlockError::UnknownSlot(slot.to_string()))?;

        let result = match handler {
            SlotHandler::Variable(name) => self.set_variable(&name, args)?,
            SlotHandler::Expression => self.set_expression(single_arg(slot, args)?)?,
            SlotHandler::Imports => {
                self.set_imports(single_arg(slot, args)?)?;
                None
            }
            SlotHandler::LocalVars => {
                self.set_local_vars(single_arg(slot, args)?)?;
                None
            }
        };

        if let Some(result) = result {
            signals.emit(TRIGGERED, vec![result]);
        }
        Ok(())
    }

    async fn on_create(&mut self, config: serde_json::Value) -> Result<(), BlockError> {
        self.apply_config(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_names() {
        assert_eq!(slot_name("val"), "setVal");
        assert_eq!(slot_name("x"), "setX");
        assert_eq!(slot_name("éa"), "setÉa");
    }

    #[test]
    fn test_empty_and_repeated_names() {
        let evaluator = Evaluator::new(vec!["a", "", "a", "b"]).unwrap();
        assert_eq!(evaluator.variable_names(), ["a", "b"]);
        assert_eq!(
            evaluator.slots(),
            vec!["setExpression", "setImports", "setLocalVars", "setA", "setB"]
        );
    }

    #[test]
    fn test_colliding_variable_name() {
        let err = Evaluator::new(vec!["expression"]).unwrap_err();
        assert!(matches!(err, BlockError::Config(_)));
    }

    #[test]
    fn test_syntax_error_surfaces_on_evaluation() {
        let mut evaluator = Evaluator::new(vec!["val"]).unwrap();
        assert_eq!(evaluator.set_expression("val +").unwrap(), None);
        let err = evaluator.set_variable("val", vec![Value::Int(1)]).unwrap_err();
        assert!(matches!(err, BlockError::Evaluation(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_no_variables_is_always_ready() {
        let mut evaluator = Evaluator::new(Vec::<Value>::new()).unwrap();
        assert!(evaluator.is_ready());
        assert_eq!(evaluator.set_expression("1 + 1").unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn test_on_create_applies_present_keys() {
        let mut evaluator = Evaluator::new(vec!["val"]).unwrap();
        tokio_test::block_on(evaluator.on_create(serde_json::json!({
            "imports": "json",
            "expr": "val"
        })))
        .unwrap();

        assert_eq!(evaluator.imports(), ["json"]);
        assert_eq!(evaluator.expression(), "val");
        assert!(evaluator.local_vars().is_empty());
    }
}
