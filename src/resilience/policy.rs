use serde::{Deserialize, Serialize};

/// What a host does when a slot call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Report the error and stop serving the block
    #[default]
    Propagate,

    /// Report the error to the caller, log it and keep serving
    Skip,
}
