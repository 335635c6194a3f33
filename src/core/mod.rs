pub mod block;
pub mod error;
pub mod value;

pub use block::{Block, BlockFactory, Emission, SlotCall, Signals};
pub use error::BlockError;
pub use value::Value;
