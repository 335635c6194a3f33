use serde::{Deserialize, Serialize};

/// Lifecycle of a hosted block
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockState {
    /// Spawned, not yet activated
    #[default]
    Idle,
    /// Serving slot calls
    Active,
    /// Deactivated after the inbox closed
    Inactive,
    Error {
        error_msg: String,
    },
}

impl BlockState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &BlockState) -> bool {
        use BlockState::*;

        matches!(
            (self, target),
            (Idle, Active) | (Idle, Error { .. }) | (Active, Inactive) | (Active, Error { .. })
        )
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Error { .. } => "Error",
        }
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Inactive | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(BlockState::Idle.can_transition_to(&BlockState::Active));
        assert!(BlockState::Active.can_transition_to(&BlockState::Inactive));
        assert!(!BlockState::Inactive.can_transition_to(&BlockState::Active));
    }

    #[test]
    fn test_error_is_terminal() {
        let error = BlockState::Error {
            error_msg: "boom".to_string(),
        };
        assert!(BlockState::Active.can_transition_to(&error));
        assert!(!error.can_transition_to(&BlockState::Idle));
        assert!(error.is_terminal());
    }
}
