pub mod logging;
pub mod metrics;

pub use logging::{init as init_logging, LogConfig};
pub use metrics::{MetricsSnapshot, SlotMetrics};
