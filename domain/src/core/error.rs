//! Domain error types

use crate::consensus::phase::{Phase, PhaseStatus};
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid phase transition for {phase}: {from} -> {to}")]
    InvalidTransition {
        phase: Phase,
        from: PhaseStatus,
        to: PhaseStatus,
    },

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Unknown option for {phase}: {value}")]
    UnknownOption { phase: Phase, value: String },

    #[error("Unknown activity: {0}")]
    UnknownActivity(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Phase tracking has not been initialized")]
    TrackingNotInitialized,
}

impl DomainError {
    /// Check if this error was caused by member-supplied input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DomainError::UnknownPhase(_)
                | DomainError::UnknownOption { .. }
                | DomainError::UnknownActivity(_)
                | DomainError::InvalidDateRange(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_display() {
        let error = DomainError::InvalidTransition {
            phase: Phase::DateSelection,
            from: PhaseStatus::Completed,
            to: PhaseStatus::Active,
        };
        assert_eq!(
            error.to_string(),
            "Invalid phase transition for date_selection: completed -> active"
        );
    }

    #[test]
    fn test_is_input_error_check() {
        assert!(DomainError::UnknownPhase("x".to_string()).is_input_error());
        assert!(DomainError::InvalidDateRange("bad".to_string()).is_input_error());
        assert!(!DomainError::TrackingNotInitialized.is_input_error());
    }
}
