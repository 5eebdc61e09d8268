//! Final plan view and formatter trait

use serde::Serialize;
use tripsync_domain::{
    DateRange, Itinerary, OutputFormat, Phase, PhaseStatus, RunStatus, SelectedActivity, Trip,
    TripId, TripStatus,
};

/// Everything shown to the user once a scenario has been driven
#[derive(Debug, Clone, Serialize)]
pub struct TripPlan {
    pub trip_id: TripId,
    pub name: String,
    pub status: TripStatus,
    pub run_status: Option<RunStatus>,
    pub destination: Option<String>,
    pub dates: Option<DateRange>,
    pub duration_days: Option<u32>,
    pub phases: Vec<PhaseLine>,
    pub selected_activities: Vec<SelectedActivity>,
    pub itinerary: Option<Itinerary>,
    /// Scenario actions the engine refused, with the reason
    pub rejected_actions: Vec<String>,
    /// Scenario actions never applied because the run stopped first
    pub unused_actions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseLine {
    pub phase: Phase,
    pub status: PhaseStatus,
    pub blocked: bool,
}

impl TripPlan {
    pub fn new(trip: &Trip, run_status: Option<RunStatus>, itinerary: Option<Itinerary>) -> Self {
        let phases = Phase::PIPELINE
            .iter()
            .map(|phase| {
                let data = trip.phase_tracking.as_ref().and_then(|t| t.phase(*phase));
                PhaseLine {
                    phase: *phase,
                    status: data.map(|d| d.status).unwrap_or_default(),
                    blocked: data.is_some_and(|d| d.blocked.is_some()),
                }
            })
            .collect();

        Self {
            trip_id: trip.id.clone(),
            name: trip.name.clone(),
            status: trip.status,
            run_status,
            destination: trip.destination.clone(),
            dates: trip.selected_dates,
            duration_days: trip.trip_duration_days,
            phases,
            selected_activities: trip.selected_activities.clone(),
            itinerary,
            rejected_actions: Vec::new(),
            unused_actions: 0,
        }
    }

    pub fn with_action_report(mut self, rejected: Vec<String>, unused: usize) -> Self {
        self.rejected_actions = rejected;
        self.unused_actions = unused;
        self
    }
}

/// Renders a [`TripPlan`]
pub trait OutputFormatter {
    fn format(&self, plan: &TripPlan) -> String;
}

/// Machine-readable output
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(&self, plan: &TripPlan) -> String {
        serde_json::to_string_pretty(plan).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Formatter for the configured output format
pub fn formatter_for(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(crate::output::console::ConsoleFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}
