pub mod actor;
pub mod state;

pub use actor::{BlockActor, BlockHandle};
pub use state::BlockState;
