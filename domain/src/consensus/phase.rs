//! Phases and their per-phase data

use super::vote::VoteOption;
use crate::core::error::DomainError;
use crate::core::string::normalize_choice;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A consensus phase, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    DestinationDecision,
    DateSelection,
    ActivityVoting,
    ItineraryApproval,
}

impl Phase {
    /// All phases in the order they are visited
    pub const PIPELINE: [Phase; 4] = [
        Phase::DestinationDecision,
        Phase::DateSelection,
        Phase::ActivityVoting,
        Phase::ItineraryApproval,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::DestinationDecision => "destination_decision",
            Phase::DateSelection => "date_selection",
            Phase::ActivityVoting => "activity_voting",
            Phase::ItineraryApproval => "itinerary_approval",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::DestinationDecision => "Destination",
            Phase::DateSelection => "Dates",
            Phase::ActivityVoting => "Activities",
            Phase::ItineraryApproval => "Itinerary",
        }
    }

    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::DestinationDecision => Some(Phase::DateSelection),
            Phase::DateSelection => Some(Phase::ActivityVoting),
            Phase::ActivityVoting => Some(Phase::ItineraryApproval),
            Phase::ItineraryApproval => None,
        }
    }

    /// Phases that come before this one
    pub fn predecessors(self) -> impl Iterator<Item = Phase> {
        Self::PIPELINE.into_iter().take_while(move |p| *p != self)
    }

    /// Whether the phase resolves on member readiness rather than on a vote
    pub fn is_readiness_gated(self) -> bool {
        matches!(self, Phase::ActivityVoting | Phase::ItineraryApproval)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PIPELINE
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| DomainError::UnknownPhase(s.to_string()))
    }
}

/// Status of one phase. Ordered: transitions only move forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Active,
    VotingInProgress,
    Completed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Active => "active",
            PhaseStatus::VotingInProgress => "voting_in_progress",
            PhaseStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a phase cannot proceed without outside correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    IncompatibleDates,
}

/// State of one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseData {
    pub status: PhaseStatus,
    #[serde(default)]
    pub options: Vec<VoteOption>,
    #[serde(default)]
    pub users_ready: BTreeSet<String>,
    /// Values computed while evaluating the phase (overlapping date tokens)
    #[serde(default)]
    pub candidates: Vec<String>,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub blocked: Option<BlockReason>,
    /// Activation was requested before the predecessors completed
    #[serde(default)]
    pub queued: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PhaseData {
    pub fn is_completed(&self) -> bool {
        self.status == PhaseStatus::Completed
    }

    /// Move to `to`. Moving to the current status is a no-op; moving backwards fails.
    pub fn transition(
        &mut self,
        phase: Phase,
        to: PhaseStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if to < self.status {
            return Err(DomainError::InvalidTransition {
                phase,
                from: self.status,
                to,
            });
        }
        if to == self.status {
            return Ok(());
        }
        self.status = to;
        if to >= PhaseStatus::Active && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if to == PhaseStatus::Completed && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Record a member as ready. Returns false if they already were.
    pub fn mark_ready(&mut self, member_id: &str) -> bool {
        self.users_ready.insert(member_id.to_string())
    }

    /// Withdraw readiness. Returns false if the member was not ready.
    pub fn unmark_ready(&mut self, member_id: &str) -> bool {
        self.users_ready.remove(member_id)
    }

    /// Number of `members` who are ready
    pub fn ready_count(&self, members: &[String]) -> usize {
        members
            .iter()
            .filter(|m| self.users_ready.contains(m.as_str()))
            .count()
    }

    pub fn all_ready(&self, members: &[String]) -> bool {
        self.ready_count(members) >= members.len()
    }

    /// Replace the member's ballot with `choices`.
    ///
    /// Choices are matched against option values case-insensitively. The
    /// whole ballot is rejected if any choice is unknown, so a failed
    /// submission leaves every option untouched. An empty `choices`
    /// withdraws the member's vote.
    pub fn cast_vote(
        &mut self,
        phase: Phase,
        member_id: &str,
        choices: &[String],
    ) -> Result<(), DomainError> {
        let mut picked = Vec::with_capacity(choices.len());
        for choice in choices {
            let wanted = normalize_choice(choice);
            let index = self
                .options
                .iter()
                .position(|o| normalize_choice(&o.value) == wanted)
                .ok_or_else(|| DomainError::UnknownOption {
                    phase,
                    value: choice.clone(),
                })?;
            picked.push(index);
        }

        for (index, option) in self.options.iter_mut().enumerate() {
            if picked.contains(&index) {
                option.add_voter(member_id);
            } else {
                option.remove_voter(member_id);
            }
        }
        Ok(())
    }

    /// Members who have voted for at least one option
    pub fn voters(&self) -> BTreeSet<&str> {
        self.options
            .iter()
            .flat_map(|o| o.voters.iter().map(String::as_str))
            .collect()
    }

    /// Whether every member has cast a ballot
    pub fn all_voted(&self, members: &[String]) -> bool {
        let voters = self.voters();
        members.iter().all(|m| voters.contains(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn voting_data(values: &[&str]) -> PhaseData {
        PhaseData {
            status: PhaseStatus::VotingInProgress,
            options: values.iter().map(|v| VoteOption::new(*v, *v)).collect(),
            ..PhaseData::default()
        }
    }

    #[test]
    fn test_phase_order_and_parse() {
        assert_eq!(Phase::DestinationDecision.next(), Some(Phase::DateSelection));
        assert_eq!(Phase::ItineraryApproval.next(), None);
        assert_eq!(
            Phase::ActivityVoting.predecessors().collect::<Vec<_>>(),
            vec![Phase::DestinationDecision, Phase::DateSelection]
        );
        assert_eq!("date_selection".parse::<Phase>().unwrap(), Phase::DateSelection);
        assert!("lunch".parse::<Phase>().is_err());
    }

    #[test]
    fn test_transition_forward_only() {
        let now = Utc::now();
        let mut data = PhaseData::default();
        data.transition(Phase::DateSelection, PhaseStatus::Active, now).unwrap();
        assert_eq!(data.started_at, Some(now));
        data.transition(Phase::DateSelection, PhaseStatus::Active, now).unwrap();

        let err = data
            .transition(Phase::DateSelection, PhaseStatus::Pending, now)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_completed_at_set_once() {
        let first = Utc::now();
        let later = first + chrono::Duration::seconds(30);
        let mut data = PhaseData::default();
        data.transition(Phase::ItineraryApproval, PhaseStatus::Completed, first)
            .unwrap();
        data.transition(Phase::ItineraryApproval, PhaseStatus::Completed, later)
            .unwrap();
        assert_eq!(data.completed_at, Some(first));
        assert!(
            data.transition(Phase::ItineraryApproval, PhaseStatus::VotingInProgress, later)
                .is_err()
        );
    }

    #[test]
    fn test_readiness_toggle() {
        let m = members(&["a", "b"]);
        let mut data = PhaseData::default();
        assert!(data.mark_ready("a"));
        assert!(!data.mark_ready("a"));
        assert_eq!(data.users_ready.len(), 1);
        assert!(!data.all_ready(&m));

        data.mark_ready("b");
        assert!(data.all_ready(&m));

        assert!(data.unmark_ready("a"));
        assert_eq!(data.users_ready.len(), 1);
        assert!(!data.unmark_ready("a"));
    }

    #[test]
    fn test_repeated_vote_does_not_double_count() {
        let mut data = voting_data(&["a", "b"]);
        for _ in 0..3 {
            data.cast_vote(Phase::DestinationDecision, "m1", &["A".to_string()])
                .unwrap();
        }
        assert_eq!(data.options[0].votes(), 1);
        assert_eq!(data.options[1].votes(), 0);
    }

    #[test]
    fn test_changing_vote_moves_voter() {
        let mut data = voting_data(&["a", "b"]);
        data.cast_vote(Phase::DestinationDecision, "m1", &["a".to_string()])
            .unwrap();
        data.cast_vote(Phase::DestinationDecision, "m1", &["b".to_string()])
            .unwrap();
        assert_eq!(data.options[0].votes(), 0);
        assert_eq!(data.options[1].votes(), 1);

        data.cast_vote(Phase::DestinationDecision, "m1", &[]).unwrap();
        assert!(data.voters().is_empty());
    }

    #[test]
    fn test_unknown_choice_leaves_ballot_untouched() {
        let mut data = voting_data(&["a", "b"]);
        data.cast_vote(Phase::DestinationDecision, "m1", &["a".to_string()])
            .unwrap();
        let err = data
            .cast_vote(
                Phase::DestinationDecision,
                "m1",
                &["b".to_string(), "zzz".to_string()],
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownOption { .. }));
        assert_eq!(data.options[0].votes(), 1);
        assert_eq!(data.options[1].votes(), 0);
    }

    #[test]
    fn test_all_voted() {
        let m = members(&["m1", "m2"]);
        let mut data = voting_data(&["a", "b"]);
        data.cast_vote(Phase::DateSelection, "m1", &["a".to_string()]).unwrap();
        assert!(!data.all_voted(&m));
        data.cast_vote(Phase::DateSelection, "m2", &["b".to_string()]).unwrap();
        assert!(data.all_voted(&m));
    }
}
