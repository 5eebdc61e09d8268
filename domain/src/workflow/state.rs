//! Workflow state for one planning run

use super::payloads::{ActivityCatalog, Itinerary};
use super::route::{NextTask, RouteKey};
use super::update::{AgentDataPatch, StateUpdate};
use crate::consensus::activity::SelectedActivity;
use crate::consensus::phase::Phase;
use crate::consensus::tracking::PhaseTracking;
use crate::trip::entities::{Trip, TripId};
use crate::trip::preference::PreferencesSummary;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One line in the run's audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Worker or component that wrote the entry
    pub source: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Worker inputs and outputs.
///
/// Any worker may read what an earlier worker wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    #[serde(default)]
    pub preferences_summary: Option<PreferencesSummary>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub activity_catalog: Option<ActivityCatalog>,
    #[serde(default)]
    pub selected_activities: Option<Vec<SelectedActivity>>,
    #[serde(default)]
    pub trip_duration_days: Option<u32>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub itinerary: Option<Itinerary>,
    #[serde(default)]
    pub phase_tracking: Option<PhaseTracking>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl AgentData {
    pub fn merge(&mut self, patch: AgentDataPatch) {
        patch.preferences_summary.apply(&mut self.preferences_summary);
        patch.destination.apply(&mut self.destination);
        patch.activity_catalog.apply(&mut self.activity_catalog);
        patch.selected_activities.apply(&mut self.selected_activities);
        patch.trip_duration_days.apply(&mut self.trip_duration_days);
        patch.start_date.apply(&mut self.start_date);
        patch.itinerary.apply(&mut self.itinerary);
        patch.phase_tracking.apply(&mut self.phase_tracking);
        self.warnings.extend(patch.warnings);
    }
}

/// Per-run context threaded through every worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub trip_id: TripId,
    pub goal: String,
    /// Supervisor decisions taken in the current run segment
    pub steps: u32,
    pub done: bool,
    #[serde(default)]
    pub next_task: Option<NextTask>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub last_task: Option<RouteKey>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub messages: Vec<AuditEntry>,
    #[serde(default)]
    pub data: AgentData,
}

impl WorkflowState {
    pub fn new(trip_id: TripId, goal: impl Into<String>) -> Self {
        Self {
            trip_id,
            goal: goal.into(),
            steps: 0,
            done: false,
            next_task: None,
            reason: None,
            last_task: None,
            members: Vec::new(),
            messages: Vec::new(),
            data: AgentData::default(),
        }
    }

    pub fn record(&mut self, source: impl Into<String>, content: impl Into<String>) {
        self.messages.push(AuditEntry::new(source, content));
    }

    /// Merge a worker's update.
    ///
    /// Scalars overwrite, messages append, agent data merges field by field.
    /// Returns the phase the worker asked to activate, if any.
    pub fn apply(&mut self, update: StateUpdate) -> Option<Phase> {
        if let Some(done) = update.done {
            self.done = done;
        }
        if let Some(next) = update.next_task {
            self.next_task = Some(next);
        }
        if let Some(reason) = update.reason {
            self.reason = Some(reason);
        }
        self.messages.extend(update.messages);
        self.data.merge(update.data);
        update.activate
    }

    /// Refresh the fields the trip record owns.
    ///
    /// Trip values win when present; state values the trip does not carry
    /// yet are kept.
    pub fn sync_from_trip(&mut self, trip: &Trip) {
        self.members = trip.members.clone();
        if trip.destination.is_some() {
            self.data.destination = trip.destination.clone();
        }
        if trip.trip_duration_days.is_some() {
            self.data.trip_duration_days = trip.trip_duration_days;
        }
        if let Some(range) = trip.selected_dates {
            self.data.start_date = Some(range.start());
        }
        if !trip.selected_activities.is_empty() {
            self.data.selected_activities = Some(trip.selected_activities.clone());
        }
        self.data.phase_tracking = trip.phase_tracking.clone();
    }

    pub fn phase_tracking(&self) -> Option<&PhaseTracking> {
        self.data.phase_tracking.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::update::Patch;

    fn state() -> WorkflowState {
        WorkflowState::new(TripId::new("t1"), "plan a trip")
    }

    #[test]
    fn test_merge_preserves_untouched_fields() {
        let mut state = state();
        state.data.destination = Some("Lisbon".to_string());
        state.data.trip_duration_days = Some(5);

        let mut update = StateUpdate::new().with_message("itinerary_planner", "planned");
        update.data.trip_duration_days = Patch::Set(6);
        state.apply(update);

        assert_eq!(state.data.destination.as_deref(), Some("Lisbon"));
        assert_eq!(state.data.trip_duration_days, Some(6));
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn test_clear_is_explicit() {
        let mut state = state();
        state.data.phase_tracking = Some(PhaseTracking::new());

        state.apply(StateUpdate::new());
        assert!(state.data.phase_tracking.is_some());

        let mut update = StateUpdate::new();
        update.data.phase_tracking = Patch::Clear;
        state.apply(update);
        assert!(state.data.phase_tracking.is_none());
    }

    #[test]
    fn test_scalars_overwrite_and_warnings_append() {
        let mut state = state();
        state.data.warnings.push("first".to_string());
        let update = StateUpdate {
            done: Some(true),
            next_task: Some(NextTask::End),
            ..StateUpdate::new()
        }
        .with_warning("second")
        .with_activation(Phase::ActivityVoting);

        let activation = state.apply(update);
        assert!(state.done);
        assert_eq!(state.next_task, Some(NextTask::End));
        assert_eq!(state.data.warnings, vec!["first", "second"]);
        assert_eq!(activation, Some(Phase::ActivityVoting));
    }

    #[test]
    fn test_sync_from_trip() {
        let mut trip = Trip::new("t1", "Summer", vec!["a".to_string()]);
        trip.destination = Some("Rome".to_string());
        trip.selected_dates = Some("2024-06-01:2024-06-03".parse().unwrap());
        trip.trip_duration_days = Some(3);

        let mut state = state();
        state.data.destination = Some("stale".to_string());
        state.sync_from_trip(&trip);

        assert_eq!(state.members, vec!["a"]);
        assert_eq!(state.data.destination.as_deref(), Some("Rome"));
        assert_eq!(state.data.trip_duration_days, Some(3));
        assert_eq!(
            state.data.start_date,
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert!(state.data.phase_tracking.is_none());
    }
}
