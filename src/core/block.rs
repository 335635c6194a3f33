use async_trait::async_trait;

use super::{BlockError, Value};

/// One slot invocation, as queued by a host
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCall {
    pub slot: String,
    pub args: Vec<Value>,
}

impl SlotCall {
    pub fn new(slot: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            slot: slot.into(),
            args,
        }
    }
}

/// A signal emitted while a slot call was handled
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub signal: String,
    pub args: Vec<Value>,
}

/// Buffer collecting signals emitted during one slot call, in emission order
#[derive(Debug, Default)]
pub struct Signals {
    emitted: Vec<Emission>,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, signal: impl Into<String>, args: Vec<Value>) {
        self.emitted.push(Emission {
            signal: signal.into(),
            args,
        });
    }

    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Emission> {
        self.emitted.iter()
    }

    /// Arguments of every emission of `signal`
    pub fn emitted(&self, signal: &str) -> Vec<&[Value]> {
        self.emitted
            .iter()
            .filter(|e| e.signal == signal)
            .map(|e| e.args.as_slice())
            .collect()
    }

    /// Take all buffered emissions, leaving the buffer empty
    pub fn take(&mut self) -> Vec<Emission> {
        std::mem::take(&mut self.emitted)
    }
}

/// Base trait for every block hosted in a signal/slot graph.
///
/// Blocks are purely event driven: the host invokes slots by name and
/// forwards whatever the block emits into `signals`. A block instance is not
/// safe for concurrent slot calls; `&mut self` makes the host serialize them.
#[async_trait]
pub trait Block: Send + Sync {
    /// Registry path, e.g. `/blocks/evaluator`
    fn path(&self) -> &str;

    /// Names of all slots this instance accepts
    fn slots(&self) -> Vec<String>;

    /// Names of all signals this instance may emit
    fn signals(&self) -> Vec<String>;

    /// Invoke a slot synchronously. Signals are emitted into `signals`
    /// before this returns.
    fn call_slot(
        &mut self,
        slot: &str,
        args: Vec<Value>,
        signals: &mut Signals,
    ) -> Result<(), BlockError>;

    /// Called once after construction with the block's JSON configuration
    async fn on_create(&mut self, _config: serde_json::Value) -> Result<(), BlockError> {
        Ok(())
    }

    /// Called by the host before the first slot call
    async fn activate(&mut self) -> Result<(), BlockError> {
        Ok(())
    }

    /// Called by the host after the last slot call
    async fn deactivate(&mut self) -> Result<(), BlockError> {
        Ok(())
    }
}

/// Construction from positional factory arguments
pub trait BlockFactory: Sized {
    fn create(args: &[Value]) -> Result<Self, BlockError>;
}
