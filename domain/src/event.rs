//! Events published to trip listeners

use crate::consensus::phase::Phase;
use crate::consensus::vote::VoteOption;
use crate::run::RunStatus;
use serde::{Deserialize, Serialize};

/// Lifecycle of a single worker invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentActivity {
    Started,
    Completed,
    CompletedWithWarnings,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementLevel {
    Info,
    Warning,
    Error,
}

/// Vote count for one option, as shown to members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTally {
    pub value: String,
    pub label: String,
    pub votes: usize,
}

impl From<&VoteOption> for OptionTally {
    fn from(option: &VoteOption) -> Self {
        Self {
            value: option.value.clone(),
            label: option.label.clone(),
            votes: option.votes(),
        }
    }
}

/// Something trip members should hear about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TripEvent {
    AgentStatus {
        agent: String,
        status: AgentActivity,
        step: u32,
        /// 0.0 to 1.0
        progress: f32,
    },
    RunStatusChanged {
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    VotingPrompt {
        phase: Phase,
        options: Vec<OptionTally>,
        message: String,
    },
    VoteUpdate {
        phase: Phase,
        options: Vec<OptionTally>,
        voters: usize,
        total_members: usize,
    },
    PhaseReadyUpdate {
        phase: Phase,
        users_ready: usize,
        total: usize,
        all_ready: bool,
    },
    PhaseResolved {
        phase: Phase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decision: Option<String>,
        rationale: String,
    },
    Announcement {
        level: AnnouncementLevel,
        message: String,
    },
}

impl TripEvent {
    pub fn info(message: impl Into<String>) -> Self {
        TripEvent::Announcement {
            level: AnnouncementLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        TripEvent::Announcement {
            level: AnnouncementLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        TripEvent::Announcement {
            level: AnnouncementLevel::Error,
            message: message.into(),
        }
    }

    /// Wire name of the event, matching the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            TripEvent::AgentStatus { .. } => "agent_status",
            TripEvent::RunStatusChanged { .. } => "run_status_changed",
            TripEvent::VotingPrompt { .. } => "voting_prompt",
            TripEvent::VoteUpdate { .. } => "vote_update",
            TripEvent::PhaseReadyUpdate { .. } => "phase_ready_update",
            TripEvent::PhaseResolved { .. } => "phase_resolved",
            TripEvent::Announcement { .. } => "announcement",
        }
    }
}
