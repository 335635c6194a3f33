use crate::core::{Block, BlockError, Emission, Signals, SlotCall};
use crate::observability::SlotMetrics;
use super::ErrorPolicy;
use std::sync::Arc;
use tracing::{error, warn};

/// Result of one slot call after the error policy was applied
#[derive(Debug, Clone, PartialEq)]
pub enum SlotOutcome {
    /// The call succeeded; these signals were emitted, in order
    Emitted(Vec<Emission>),
    /// The call failed but the block keeps serving
    Skipped(BlockError),
    /// The call failed and the block must stop
    Failed(BlockError),
}

/// Wraps a block with metrics and an error policy
pub struct ResilientBlock {
    inner: Box<dyn Block>,
    metrics: Arc<SlotMetrics>,
    error_policy: ErrorPolicy,
}

impl ResilientBlock {
    pub fn new(
        inner: Box<dyn Block>,
        metrics: Arc<SlotMetrics>,
        error_policy: ErrorPolicy,
    ) -> Self {
        Self {
            inner,
            metrics,
            error_policy,
        }
    }

    pub fn inner(&self) -> &dyn Block {
        self.inner.as_ref()
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    pub fn handle(&mut self, call: SlotCall) -> SlotOutcome {
        self.metrics.record_call();
        let start = self.metrics.start_call();

        let mut signals = Signals::new();
        let result = self.inner.call_slot(&call.slot, call.args, &mut signals);
        self.metrics.finish_call(start);

        match result {
            Ok(()) => {
                let emissions = signals.take();
                self.metrics.record_emissions(emissions.len() as u64);
                SlotOutcome::Emitted(emissions)
            }
            Err(e) => {
                self.metrics.record_error();
                let path = self.inner.path();

                match self.error_policy {
                    ErrorPolicy::Propagate => {
                        error!(path, slot = %call.slot, error = %e, "slot call failed");
                        SlotOutcome::Failed(e)
                    }
                    ErrorPolicy::Skip => {
                        warn!(path, slot = %call.slot, error = %e, "slot call failed, skipping");
                        SlotOutcome::Skipped(e)
                    }
                }
            }
        }
    }

    pub async fn activate(&mut self) -> Result<(), BlockError> {
        self.inner.activate().await
    }

    pub async fn deactivate(&mut self) -> Result<(), BlockError> {
        self.inner.deactivate().await
    }
}
