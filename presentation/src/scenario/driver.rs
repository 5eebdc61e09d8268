//! Plays a scenario against a run supervisor
//!
//! The run goes first. Whenever it pauses to wait for members, scripted
//! actions are applied one at a time until one of them resumes the run.

use super::file::{Scenario, ScenarioAction};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use tripsync_application::{
    ActionOutcome, CheckpointStore, RepositoryError, RunError, RunSupervisor, TripRepository,
};
use tripsync_domain::{Itinerary, RunStatus, Trip, TripId};

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("A run for trip {trip_id} is already {status}")]
    AlreadyRunning { trip_id: TripId, status: RunStatus },

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Run task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Where a driven scenario ended up
#[derive(Debug)]
pub struct DriveReport {
    pub final_status: Option<RunStatus>,
    pub applied: usize,
    /// `"<action> by <member>: <reason>"`
    pub rejected: Vec<String>,
    pub unused: usize,
    pub trip: Trip,
    pub itinerary: Option<Itinerary>,
}

pub struct ScenarioDriver {
    runs: Arc<RunSupervisor>,
    repo: Arc<dyn TripRepository>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl ScenarioDriver {
    pub fn new(
        runs: Arc<RunSupervisor>,
        repo: Arc<dyn TripRepository>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            runs,
            repo,
            checkpoints,
        }
    }

    /// Start the run and feed it actions until it completes, fails, or
    /// runs out of script. The trip must already be seeded.
    pub async fn drive(&self, scenario: &Scenario) -> Result<DriveReport, DriveError> {
        let trip_id = scenario.trip_id();
        let ticket = self.runs.start_run(&trip_id).await?;
        if !ticket.started {
            return Err(DriveError::AlreadyRunning {
                trip_id,
                status: ticket.status,
            });
        }

        let mut pending = ticket.handle;
        let mut actions = scenario.actions.iter();
        let mut applied = 0;
        let mut rejected = Vec::new();

        loop {
            if let Some(handle) = pending.take() {
                let status = handle.await?;
                debug!(trip_id = %trip_id, %status, "Run segment finished");
            }
            if self.runs.status(&trip_id) != Some(RunStatus::Paused) {
                break;
            }
            let Some(action) = actions.next() else {
                info!(trip_id = %trip_id, "Scenario exhausted while the run is paused");
                break;
            };

            match self.apply(&trip_id, action).await {
                Ok(outcome) => {
                    applied += 1;
                    pending = outcome.resumed;
                }
                Err(RunError::Consensus(e)) if e.is_input_error() => {
                    warn!(trip_id = %trip_id, action = action.name(), member = action.member(), "Action rejected: {}", e);
                    rejected.push(format!("{} by {}: {}", action.name(), action.member(), e));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let trip = self.repo.load_trip(&trip_id).await?;
        let itinerary = self
            .checkpoints
            .load_checkpoint(&trip_id)
            .await?
            .and_then(|state| state.data.itinerary);

        Ok(DriveReport {
            final_status: self.runs.status(&trip_id),
            applied,
            rejected,
            unused: actions.count(),
            trip,
            itinerary,
        })
    }

    async fn apply(&self, trip_id: &TripId, action: &ScenarioAction) -> Result<ActionOutcome, RunError> {
        debug!(trip_id = %trip_id, action = action.name(), member = action.member(), "Applying action");
        match action {
            ScenarioAction::Vote {
                member,
                phase,
                choices,
            } => self.runs.submit_vote(trip_id, *phase, member, choices).await,
            ScenarioAction::Ready { member, phase } => {
                self.runs.set_ready(trip_id, *phase, member, true).await
            }
            ScenarioAction::Unready { member, phase } => {
                self.runs.set_ready(trip_id, *phase, member, false).await
            }
            ScenarioAction::ActivityVote {
                member,
                activity,
                stance,
            } => {
                let activity_id = self.resolve_activity(trip_id, activity).await?;
                self.runs
                    .cast_activity_vote(trip_id, member, &activity_id, *stance)
                    .await
            }
            ScenarioAction::ResubmitAvailability {
                member,
                available_dates,
            } => {
                self.runs
                    .resubmit_availability(trip_id, member, available_dates.clone())
                    .await
            }
        }
    }

    /// Catalog id for `reference`, matching ids first and names second.
    /// Unknown references pass through for the engine to reject.
    async fn resolve_activity(&self, trip_id: &TripId, reference: &str) -> Result<String, RunError> {
        let trip = self.repo.load_trip(trip_id).await?;
        let wanted = reference.trim();
        let found = trip
            .activity_catalog
            .iter()
            .find(|a| a.id == wanted)
            .or_else(|| {
                trip.activity_catalog
                    .iter()
                    .find(|a| a.name.eq_ignore_ascii_case(wanted))
            });
        Ok(found.map_or_else(|| wanted.to_string(), |a| a.id.clone()))
    }
}
