//! Consensus resolution worker

use crate::ports::repository::RepositoryError;
use crate::ports::worker::{Worker, WorkerError};
use crate::use_cases::consensus::{ConsensusEngine, ConsensusError};
use async_trait::async_trait;
use std::sync::Arc;
use tripsync_domain::{AgentDataPatch, Patch, RouteKey, StateUpdate, WorkflowState};

/// Evaluates the current phase through the [`ConsensusEngine`] and mirrors
/// the resulting trip record into the run's agent data.
pub struct ConsensusResolver {
    engine: Arc<ConsensusEngine>,
}

impl ConsensusResolver {
    pub fn new(engine: Arc<ConsensusEngine>) -> Self {
        Self { engine }
    }
}

impl From<ConsensusError> for WorkerError {
    fn from(e: ConsensusError) -> Self {
        match e {
            ConsensusError::Repository(RepositoryError::TripNotFound(id)) => {
                WorkerError::TripNotFound(id.to_string())
            }
            ConsensusError::Repository(RepositoryError::Storage(msg)) => WorkerError::Storage(msg),
            other => WorkerError::Other(other.to_string()),
        }
    }
}

#[async_trait]
impl Worker for ConsensusResolver {
    fn name(&self) -> &str {
        RouteKey::CONSENSUS_RESOLVER.as_str()
    }

    async fn invoke(&self, state: &WorkflowState) -> Result<StateUpdate, WorkerError> {
        let outcome = self.engine.resolve_current(&state.trip_id).await?;
        let trip = &outcome.trip;

        let message = if outcome.resolved.is_empty() {
            match trip.phase_tracking.as_ref().and_then(|t| t.current()) {
                Some((phase, data)) => format!("{} is {}", phase, data.status),
                None => "Nothing to resolve".to_string(),
            }
        } else {
            let names: Vec<&str> = outcome.resolved.iter().map(|p| p.display_name()).collect();
            format!("Resolved: {}", names.join(", "))
        };

        let mut update = StateUpdate::new().with_message(self.name(), message);
        update.data = AgentDataPatch {
            // cleared when the trip has no tracking at all
            phase_tracking: trip.phase_tracking.clone().into(),
            destination: trip.destination.clone().map_or(Patch::Keep, Patch::Set),
            trip_duration_days: trip.trip_duration_days.map_or(Patch::Keep, Patch::Set),
            start_date: trip
                .selected_dates
                .map_or(Patch::Keep, |range| Patch::Set(range.start())),
            selected_activities: if trip.selected_activities.is_empty() {
                Patch::Keep
            } else {
                Patch::Set(trip.selected_activities.clone())
            },
            ..AgentDataPatch::default()
        };
        Ok(update)
    }
}
