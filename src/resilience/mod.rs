pub mod policy;
pub mod resilient_block;

pub use policy::ErrorPolicy;
pub use resilient_block::{ResilientBlock, SlotOutcome};
