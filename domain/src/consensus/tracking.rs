//! Phase tracking for one trip

use super::phase::{Phase, PhaseData, PhaseStatus};
use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of an activation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The phase became current
    Activated,
    /// The phase was already current
    AlreadyCurrent,
    /// Predecessors are still open; the phase activates once they complete
    Queued,
    /// The phase is already completed; nothing changed
    AlreadyCompleted,
}

/// Pipeline position and per-phase data for one trip.
///
/// At most one phase is current. Phases are visited in [`Phase::PIPELINE`]
/// order and never reopened after completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTracking {
    #[serde(default)]
    pub current_phase: Option<Phase>,
    #[serde(default)]
    pub phases: BTreeMap<Phase, PhaseData>,
    #[serde(default)]
    pub fairness: FairnessLedger,
}

impl Default for PhaseTracking {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracking {
    /// All phases pending, none current
    pub fn new() -> Self {
        Self {
            current_phase: None,
            phases: Phase::PIPELINE
                .into_iter()
                .map(|p| (p, PhaseData::default()))
                .collect(),
            fairness: FairnessLedger::default(),
        }
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseData> {
        self.phases.get(&phase)
    }

    pub fn phase_mut(&mut self, phase: Phase) -> &mut PhaseData {
        self.phases.entry(phase).or_default()
    }

    pub fn status(&self, phase: Phase) -> PhaseStatus {
        self.phase(phase).map(|d| d.status).unwrap_or_default()
    }

    pub fn is_completed(&self, phase: Phase) -> bool {
        self.status(phase) == PhaseStatus::Completed
    }

    pub fn current(&self) -> Option<(Phase, &PhaseData)> {
        let phase = self.current_phase?;
        self.phase(phase).map(|data| (phase, data))
    }

    pub fn predecessors_completed(&self, phase: Phase) -> bool {
        phase.predecessors().all(|p| self.is_completed(p))
    }

    /// Whether the final phase has completed
    pub fn is_pipeline_complete(&self) -> bool {
        self.is_completed(Phase::ItineraryApproval)
    }

    /// Whether progress depends on member action that has not arrived.
    ///
    /// True when the current phase is not completed, or when no phase is
    /// current but activity voting is still open.
    pub fn is_waiting_for_members(&self) -> bool {
        match self.current() {
            Some((_, data)) => !data.is_completed(),
            None => self
                .phase(Phase::ActivityVoting)
                .is_some_and(|d| !d.is_completed()),
        }
    }

    /// Request that `phase` becomes current.
    ///
    /// Completed phases are never reopened. If an earlier phase is still
    /// open the request is queued and honored by [`Self::complete`]'s caller
    /// once the predecessor finishes.
    pub fn activate(&mut self, phase: Phase, now: DateTime<Utc>) -> Result<Activation, DomainError> {
        if self.is_completed(phase) {
            return Ok(Activation::AlreadyCompleted);
        }
        if self.current_phase == Some(phase) {
            return Ok(Activation::AlreadyCurrent);
        }
        let other_open = self
            .current()
            .is_some_and(|(p, data)| p != phase && !data.is_completed());
        if other_open || !self.predecessors_completed(phase) {
            self.phase_mut(phase).queued = true;
            return Ok(Activation::Queued);
        }

        let data = self.phase_mut(phase);
        data.queued = false;
        data.transition(phase, PhaseStatus::Active, now)?;
        self.current_phase = Some(phase);
        Ok(Activation::Activated)
    }

    /// Mark `phase` completed and release it as current.
    ///
    /// Returns the next phase if its activation was queued.
    pub fn complete(&mut self, phase: Phase, now: DateTime<Utc>) -> Result<Option<Phase>, DomainError> {
        let data = self.phase_mut(phase);
        data.transition(phase, PhaseStatus::Completed, now)?;
        data.queued = false;
        data.blocked = None;
        if self.current_phase == Some(phase) {
            self.current_phase = None;
        }
        Ok(phase
            .next()
            .filter(|next| self.phase(*next).is_some_and(|d| d.queued && !d.is_completed())))
    }
}

/// Per-member record of decided votes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairnessRecord {
    pub wins: u32,
    pub compromises: u32,
}

impl FairnessRecord {
    /// Share of decisions that went the member's way, 0.5 before any decision
    pub fn fairness_score(&self) -> f64 {
        let total = self.wins + self.compromises;
        if total == 0 {
            0.5
        } else {
            f64::from(self.wins) / f64::from(total)
        }
    }
}

/// Tracks who won and who compromised across voted phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairnessLedger {
    #[serde(default)]
    pub members: BTreeMap<String, FairnessRecord>,
}

impl FairnessLedger {
    /// Record a decided vote: `winners` voted for the outcome, `others` did not.
    pub fn record<'a>(
        &mut self,
        winners: impl IntoIterator<Item = &'a str>,
        others: impl IntoIterator<Item = &'a str>,
    ) {
        for member in winners {
            self.members.entry(member.to_string()).or_default().wins += 1;
        }
        for member in others {
            self.members.entry(member.to_string()).or_default().compromises += 1;
        }
    }

    pub fn score(&self, member_id: &str) -> f64 {
        self.members
            .get(member_id)
            .copied()
            .unwrap_or_default()
            .fairness_score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracking_all_pending() {
        let tracking = PhaseTracking::new();
        assert_eq!(tracking.phases.len(), 4);
        assert!(tracking.current().is_none());
        assert!(Phase::PIPELINE.iter().all(|p| tracking.status(*p) == PhaseStatus::Pending));
    }

    #[test]
    fn test_activate_first_phase() {
        let mut tracking = PhaseTracking::new();
        let now = Utc::now();
        assert_eq!(
            tracking.activate(Phase::DestinationDecision, now).unwrap(),
            Activation::Activated
        );
        assert_eq!(tracking.current_phase, Some(Phase::DestinationDecision));
        assert_eq!(
            tracking.activate(Phase::DestinationDecision, now).unwrap(),
            Activation::AlreadyCurrent
        );
    }

    #[test]
    fn test_activation_queues_behind_open_phase() {
        let mut tracking = PhaseTracking::new();
        let now = Utc::now();
        tracking.activate(Phase::DestinationDecision, now).unwrap();
        tracking.complete(Phase::DestinationDecision, now).unwrap();
        tracking.activate(Phase::DateSelection, now).unwrap();

        assert_eq!(
            tracking.activate(Phase::ActivityVoting, now).unwrap(),
            Activation::Queued
        );
        assert_eq!(tracking.current_phase, Some(Phase::DateSelection));

        let next = tracking.complete(Phase::DateSelection, now).unwrap();
        assert_eq!(next, Some(Phase::ActivityVoting));
        assert!(tracking.current().is_none());
        assert_eq!(
            tracking.activate(Phase::ActivityVoting, now).unwrap(),
            Activation::Activated
        );
        assert!(!tracking.phase(Phase::ActivityVoting).unwrap().queued);
    }

    #[test]
    fn test_completed_phase_never_reopens() {
        let mut tracking = PhaseTracking::new();
        let now = Utc::now();
        tracking.activate(Phase::DestinationDecision, now).unwrap();
        tracking.complete(Phase::DestinationDecision, now).unwrap();
        assert_eq!(
            tracking.activate(Phase::DestinationDecision, now).unwrap(),
            Activation::AlreadyCompleted
        );
        assert!(tracking.current().is_none());
    }

    #[test]
    fn test_waiting_predicate() {
        let mut tracking = PhaseTracking::new();
        let now = Utc::now();
        // activity voting open with nothing current
        assert!(tracking.is_waiting_for_members());

        tracking.activate(Phase::DestinationDecision, now).unwrap();
        assert!(tracking.is_waiting_for_members());

        for phase in Phase::PIPELINE {
            tracking.complete(phase, now).unwrap();
        }
        assert!(!tracking.is_waiting_for_members());
        assert!(tracking.is_pipeline_complete());
    }

    #[test]
    fn test_fairness_ledger() {
        let mut ledger = FairnessLedger::default();
        assert_eq!(ledger.score("a"), 0.5);
        ledger.record(["a", "b"], ["c"]);
        ledger.record(["c"], ["a"]);
        assert_eq!(ledger.score("b"), 1.0);
        assert_eq!(ledger.score("a"), 0.5);
        assert_eq!(ledger.score("c"), 0.5);
        assert_eq!(ledger.members["c"].compromises, 1);
    }
}
