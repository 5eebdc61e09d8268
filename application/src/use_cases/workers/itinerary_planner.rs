//! Itinerary planning worker

use crate::ports::generation::{ItineraryGenerator, ItineraryRequest};
use crate::ports::sleeper::Sleeper;
use crate::ports::worker::{Worker, WorkerError};
use crate::retry::{RetryOutcome, RetryPolicy, with_retry};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use tripsync_domain::{
    Activity, AgentDataPatch, DayPlan, Itinerary, ItineraryItem, Patch, Phase, RouteKey,
    StateUpdate, TimeSlot, WorkflowState,
};

/// Turns the selected activities into a day-by-day plan and opens
/// itinerary approval.
///
/// If generation keeps failing the group still gets a placeholder plan with
/// one free day per trip day, so approval is never blocked on the generator.
pub struct ItineraryPlanner {
    generator: Arc<dyn ItineraryGenerator>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
    cache: Mutex<HashMap<String, Itinerary>>,
}

impl ItineraryPlanner {
    pub fn new(
        generator: Arc<dyn ItineraryGenerator>,
        sleeper: Arc<dyn Sleeper>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            sleeper,
            retry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn update(&self, itinerary: Itinerary, message: String, warnings: Vec<String>) -> StateUpdate {
        let mut update = StateUpdate::new()
            .with_message(self.name(), message)
            .with_activation(Phase::ItineraryApproval);
        update.data = AgentDataPatch {
            itinerary: Patch::Set(itinerary),
            warnings,
            ..AgentDataPatch::default()
        };
        update
    }
}

/// Selected activities in selection order; the whole catalog if none of the
/// selected ids is in it.
fn planned_activities(state: &WorkflowState, catalog: &[Activity]) -> Vec<Activity> {
    let selected: Vec<Activity> = state
        .data
        .selected_activities
        .iter()
        .flatten()
        .filter_map(|s| catalog.iter().find(|a| a.id == s.activity_id).cloned())
        .collect();
    if selected.is_empty() {
        catalog.to_vec()
    } else {
        selected
    }
}

fn placeholder(destination: &str, duration_days: u32, start_date: Option<NaiveDate>) -> Itinerary {
    let days = (1..=duration_days)
        .map(|day| DayPlan {
            day,
            date: start_date.and_then(|s| s.checked_add_days(Days::new(u64::from(day - 1)))),
            items: vec![ItineraryItem {
                slot: TimeSlot::Morning,
                title: format!("Free day to explore {destination}"),
                activity_id: None,
            }],
        })
        .collect();
    Itinerary {
        destination: destination.to_string(),
        start_date,
        days,
    }
}

#[async_trait]
impl Worker for ItineraryPlanner {
    fn name(&self) -> &str {
        RouteKey::ITINERARY_PLANNER.as_str()
    }

    async fn invoke(&self, state: &WorkflowState) -> Result<StateUpdate, WorkerError> {
        let data = &state.data;
        let destination = data
            .destination
            .as_deref()
            .ok_or(WorkerError::MissingInput("destination"))?;
        let catalog = data
            .activity_catalog
            .as_ref()
            .ok_or(WorkerError::MissingInput("activity_catalog"))?;
        let duration_days = data
            .trip_duration_days
            .ok_or(WorkerError::MissingInput("trip_duration_days"))?;

        let activities = planned_activities(state, &catalog.activities);
        let ids: Vec<&str> = activities.iter().map(|a| a.id.as_str()).collect();
        let key = format!(
            "{}|{}|{}|{}|{}",
            state.trip_id,
            destination,
            duration_days,
            data.start_date.map(|d| d.to_string()).unwrap_or_default(),
            ids.join(",")
        );

        let cached = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned();
        if let Some(itinerary) = cached {
            debug!(trip_id = %state.trip_id, "Itinerary cache hit");
            let message = format!("Reused {}-day itinerary for {}", itinerary.days.len(), destination);
            return Ok(self.update(itinerary, message, Vec::new()));
        }

        let request = ItineraryRequest {
            trip_id: state.trip_id.clone(),
            destination: destination.to_string(),
            duration_days,
            start_date: data.start_date,
            activities,
        };
        let outcome = with_retry(&self.retry, self.sleeper.as_ref(), |_attempt| {
            self.generator.plan(&request)
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded {
                value: itinerary,
                attempts,
            } => {
                self.cache
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(key, itinerary.clone());
                info!(
                    trip_id = %state.trip_id,
                    days = itinerary.days.len(),
                    attempts,
                    "Itinerary planned"
                );
                let message = format!(
                    "Planned {} days in {} around {} activities",
                    itinerary.days.len(),
                    destination,
                    request.activities.len()
                );
                Ok(self.update(itinerary, message, Vec::new()))
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => {
                warn!(trip_id = %state.trip_id, attempts, "Itinerary generation failed: {}", last_error);
                let warning = format!(
                    "Itinerary generation failed after {attempts} attempt(s): {last_error}; using a placeholder plan"
                );
                let itinerary = placeholder(destination, duration_days, data.start_date);
                let message = format!("Drafted a placeholder {duration_days}-day plan for {destination}");
                Ok(self.update(itinerary, message, vec![warning]))
            }
        }
    }
}
