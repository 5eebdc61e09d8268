//! Run status for the single-flight guard

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the orchestration run for one trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Starting,
    Running,
    Paused,
    Completed,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Starting => "starting",
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Completed => "completed",
            RunStatus::Error => "error",
        }
    }

    /// A trigger in this status must not start another run
    pub fn blocks_trigger(&self) -> bool {
        !matches!(self, RunStatus::Error)
    }

    /// The run loop has exited
    pub fn is_settled(&self) -> bool {
        matches!(self, RunStatus::Paused | RunStatus::Completed | RunStatus::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
