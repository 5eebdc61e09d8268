//! Engine parameters - orchestration loop and worker control.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use tripsync_domain::SelectionCaps;

/// Orchestration parameters.
///
/// Used by the supervisor (step cap), the consensus engine (trip length
/// fallback, selection caps) and the generation workers (retry, research).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Supervisor decisions allowed per run segment
    pub max_steps: u32,
    /// Trip length when no member submitted availability
    pub default_trip_days: u32,
    pub retry: RetryPolicy,
    pub research: ResearchParams,
    pub selection: SelectionCaps,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            default_trip_days: 7,
            retry: RetryPolicy::default(),
            research: ResearchParams::default(),
            selection: SelectionCaps::default(),
        }
    }
}

impl EngineConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_default_trip_days(mut self, days: u32) -> Self {
        self.default_trip_days = days;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_research(mut self, research: ResearchParams) -> Self {
        self.research = research;
        self
    }

    pub fn with_selection(mut self, selection: SelectionCaps) -> Self {
        self.selection = selection;
        self
    }
}

/// Hints passed to activity research
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchParams {
    pub max_items: usize,
    pub preferred_categories: Vec<String>,
}

impl Default for ResearchParams {
    fn default() -> Self {
        Self {
            max_items: 15,
            preferred_categories: Vec::new(),
        }
    }
}
