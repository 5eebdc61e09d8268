//! Partial updates returned by workers

use super::payloads::{ActivityCatalog, Itinerary};
use super::route::NextTask;
use super::state::AuditEntry;
use crate::consensus::activity::SelectedActivity;
use crate::consensus::phase::Phase;
use crate::consensus::tracking::PhaseTracking;
use crate::trip::preference::PreferencesSummary;
use chrono::NaiveDate;

/// Change to one optional field.
///
/// `Keep` leaves the field alone. `Clear` is the explicit way to remove a
/// value; omitting a field never clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Patch<T> {
    pub fn apply(self, target: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Set(value) => *target = Some(value),
            Patch::Clear => *target = None,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        }
    }
}

/// Field-by-field changes to [`super::AgentData`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentDataPatch {
    pub preferences_summary: Patch<PreferencesSummary>,
    pub destination: Patch<String>,
    pub activity_catalog: Patch<ActivityCatalog>,
    pub selected_activities: Patch<Vec<SelectedActivity>>,
    pub trip_duration_days: Patch<u32>,
    pub start_date: Patch<NaiveDate>,
    pub itinerary: Patch<Itinerary>,
    pub phase_tracking: Patch<PhaseTracking>,
    /// Appended, never replaced
    pub warnings: Vec<String>,
}

/// What a worker hands back after one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub done: Option<bool>,
    pub next_task: Option<NextTask>,
    pub reason: Option<String>,
    /// Appended to the audit log
    pub messages: Vec<AuditEntry>,
    pub data: AgentDataPatch,
    /// Ask the consensus engine to activate a phase
    pub activate: Option<Phase>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, source: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AuditEntry::new(source, content));
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.data.warnings.push(warning.into());
        self
    }

    pub fn with_activation(mut self, phase: Phase) -> Self {
        self.activate = Some(phase);
        self
    }

    pub fn has_warnings(&self) -> bool {
        !self.data.warnings.is_empty()
    }
}
