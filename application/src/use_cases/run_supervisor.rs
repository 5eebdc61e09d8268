//! Run supervisor
//!
//! Single-flight execution of the supervisor loop, one run per trip. A
//! trigger while a run is in flight (or already settled) returns the current
//! status without side effects.
//!
//! A run that needs member input exits `Paused`. It is resumed by the member
//! action entry points below once the consensus engine reports progress;
//! nothing polls.

use super::consensus::{ConsensusEngine, ConsensusError, EngineOutcome};
use super::supervisor::{RoutingDecision, Supervisor};
use crate::ports::notification::{NotificationSink, publish_best_effort};
use crate::ports::repository::{CheckpointStore, RepositoryError, TripRepository};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tripsync_domain::{
    AgentActivity, DateRange, NextTask, Phase, Preference, RouteKey, RunStatus, Stance,
    TripEvent, TripId, WorkflowState,
};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Trip not found: {0}")]
    TripNotFound(TripId),

    #[error(transparent)]
    Repository(RepositoryError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),
}

impl From<RepositoryError> for RunError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::TripNotFound(id) => RunError::TripNotFound(id),
            other => RunError::Repository(other),
        }
    }
}

/// Run status per trip. Check-and-set happens in one critical section.
#[derive(Default)]
pub struct RunRegistry {
    runs: Mutex<HashMap<TripId, RunStatus>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TripId, RunStatus>> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self, trip_id: &TripId) -> Option<RunStatus> {
        self.lock().get(trip_id).copied()
    }

    /// Claim `trip_id` for a new run.
    ///
    /// Fails with the existing status if that status blocks a new trigger.
    pub fn try_begin(&self, trip_id: &TripId) -> Result<(), RunStatus> {
        let mut runs = self.lock();
        match runs.get(trip_id) {
            Some(status) if status.blocks_trigger() => Err(*status),
            _ => {
                runs.insert(trip_id.clone(), RunStatus::Starting);
                Ok(())
            }
        }
    }

    pub fn set(&self, trip_id: &TripId, status: RunStatus) {
        self.lock().insert(trip_id.clone(), status);
    }

    /// Move from `from` to `to`; false if the trip was in any other status.
    pub fn transition_if(&self, trip_id: &TripId, from: RunStatus, to: RunStatus) -> bool {
        match self.lock().get_mut(trip_id) {
            Some(status) if *status == from => {
                *status = to;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&self, trip_id: &TripId) -> Option<RunStatus> {
        self.lock().remove(trip_id)
    }
}

/// Result of a start trigger
#[derive(Debug)]
pub struct RunTicket {
    pub status: RunStatus,
    /// False when the trigger was absorbed by an existing run
    pub started: bool,
    pub handle: Option<JoinHandle<RunStatus>>,
}

/// Result of a member action
#[derive(Debug)]
pub struct ActionOutcome {
    pub engine: EngineOutcome,
    /// Present when the action resumed a paused run
    pub resumed: Option<JoinHandle<RunStatus>>,
}

enum Step {
    Invoke(RouteKey),
    Exit { status: RunStatus, reason: String },
    Fail(String),
}

pub struct RunSupervisor {
    supervisor: Supervisor,
    engine: Arc<ConsensusEngine>,
    repo: Arc<dyn TripRepository>,
    checkpoints: Arc<dyn CheckpointStore>,
    notifier: Arc<dyn NotificationSink>,
    runs: RunRegistry,
    goal: String,
}

impl RunSupervisor {
    pub fn new(
        supervisor: Supervisor,
        engine: Arc<ConsensusEngine>,
        repo: Arc<dyn TripRepository>,
        checkpoints: Arc<dyn CheckpointStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            supervisor,
            engine,
            repo,
            checkpoints,
            notifier,
            runs: RunRegistry::new(),
            goal: "Plan the group trip".to_string(),
        }
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn status(&self, trip_id: &TripId) -> Option<RunStatus> {
        self.runs.status(trip_id)
    }

    pub fn engine(&self) -> &Arc<ConsensusEngine> {
        &self.engine
    }

    // ==================== Triggers ====================

    /// Start a fresh run in the background.
    pub async fn start_run(self: &Arc<Self>, trip_id: &TripId) -> Result<RunTicket, RunError> {
        if let Err(status) = self.runs.try_begin(trip_id) {
            debug!(trip_id = %trip_id, %status, "Run already exists, trigger ignored");
            return Ok(RunTicket {
                status,
                started: false,
                handle: None,
            });
        }

        let trip = match self.repo.load_trip(trip_id).await {
            Ok(trip) => trip,
            Err(e) => {
                self.runs.remove(trip_id);
                let err = RunError::from(e);
                error!(trip_id = %trip_id, "Cannot start run: {}", err);
                self.publish(trip_id, TripEvent::error(format!("Cannot start planning: {err}")))
                    .await;
                return Err(err);
            }
        };

        if let Err(e) = self.checkpoints.delete_checkpoint(trip_id).await {
            warn!(trip_id = %trip_id, "Failed to clear old checkpoint: {}", e);
        }
        let mut state = WorkflowState::new(trip_id.clone(), self.goal.clone());
        state.sync_from_trip(&trip);

        self.runs.set(trip_id, RunStatus::Running);
        info!(trip_id = %trip_id, members = trip.members.len(), "Run started");
        self.publish_status(trip_id, RunStatus::Running, None).await;

        Ok(RunTicket {
            status: RunStatus::Running,
            started: true,
            handle: Some(self.spawn(state)),
        })
    }

    /// Continue a paused run from its checkpoint.
    ///
    /// Returns `None` unless the run was paused.
    pub async fn resume_if_paused(self: &Arc<Self>, trip_id: &TripId) -> Option<JoinHandle<RunStatus>> {
        if !self
            .runs
            .transition_if(trip_id, RunStatus::Paused, RunStatus::Running)
        {
            return None;
        }

        let mut state = match self.checkpoints.load_checkpoint(trip_id).await {
            Ok(Some(state)) => state,
            Ok(None) => WorkflowState::new(trip_id.clone(), self.goal.clone()),
            Err(e) => {
                warn!(trip_id = %trip_id, "Checkpoint unavailable, resuming from a fresh state: {}", e);
                WorkflowState::new(trip_id.clone(), self.goal.clone())
            }
        };
        state.steps = 0;
        state.done = false;

        info!(trip_id = %trip_id, "Run resumed");
        self.publish_status(
            trip_id,
            RunStatus::Running,
            Some("resumed after member input".to_string()),
        )
        .await;
        Some(self.spawn(state))
    }

    /// Forget the run of `trip_id` so the next trigger starts fresh.
    ///
    /// Does not stop a run that is still in flight.
    pub async fn reset(&self, trip_id: &TripId) -> Result<Option<RunStatus>, RunError> {
        let previous = self.runs.remove(trip_id);
        self.checkpoints.delete_checkpoint(trip_id).await?;
        self.engine.lanes().forget(trip_id);
        info!(trip_id = %trip_id, ?previous, "Run reset");
        Ok(previous)
    }

    // ==================== Member actions ====================

    pub async fn submit_vote(
        self: &Arc<Self>,
        trip_id: &TripId,
        phase: Phase,
        member: &str,
        choices: &[String],
    ) -> Result<ActionOutcome, RunError> {
        let outcome = self.engine.submit_vote(trip_id, phase, member, choices).await?;
        Ok(self.after_action(trip_id, outcome).await)
    }

    pub async fn set_ready(
        self: &Arc<Self>,
        trip_id: &TripId,
        phase: Phase,
        member: &str,
        ready: bool,
    ) -> Result<ActionOutcome, RunError> {
        let outcome = self.engine.set_ready(trip_id, phase, member, ready).await?;
        Ok(self.after_action(trip_id, outcome).await)
    }

    pub async fn cast_activity_vote(
        self: &Arc<Self>,
        trip_id: &TripId,
        member: &str,
        activity_id: &str,
        stance: Stance,
    ) -> Result<ActionOutcome, RunError> {
        let outcome = self
            .engine
            .cast_activity_vote(trip_id, member, activity_id, stance)
            .await?;
        Ok(self.after_action(trip_id, outcome).await)
    }

    /// Replace `member`'s availability and re-run date selection.
    pub async fn resubmit_availability(
        self: &Arc<Self>,
        trip_id: &TripId,
        member: &str,
        windows: Vec<DateRange>,
    ) -> Result<ActionOutcome, RunError> {
        let trip = self.repo.load_trip(trip_id).await?;
        if !trip.is_member(member) {
            return Err(ConsensusError::NotAMember {
                trip_id: trip_id.clone(),
                member: member.to_string(),
            }
            .into());
        }

        let preference = self
            .repo
            .load_preferences(trip_id)
            .await?
            .into_iter()
            .rev()
            .find(|p| p.member_id == member)
            .unwrap_or_else(|| Preference::new(trip_id.clone(), member))
            .with_availability(windows);
        self.repo.save_preference(&preference).await?;
        debug!(trip_id = %trip_id, member, windows = preference.available_dates.len(), "Availability resubmitted");

        let outcome = self.engine.reevaluate_dates(trip_id).await?;
        Ok(self.after_action(trip_id, outcome).await)
    }

    async fn after_action(self: &Arc<Self>, trip_id: &TripId, outcome: EngineOutcome) -> ActionOutcome {
        let resumed = if outcome.progressed() {
            self.resume_if_paused(trip_id).await
        } else {
            None
        };
        ActionOutcome {
            engine: outcome,
            resumed,
        }
    }

    // ==================== Loop ====================

    fn spawn(self: &Arc<Self>, state: WorkflowState) -> JoinHandle<RunStatus> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_loop(state).await })
    }

    async fn run_loop(&self, mut state: WorkflowState) -> RunStatus {
        let trip_id = state.trip_id.clone();
        loop {
            // `None` asks for the assistive router
            let step = {
                let _lane = self.engine.lanes().acquire(&trip_id).await;
                match self.sync(&mut state).await {
                    Err(message) => Some(Step::Fail(message)),
                    Ok(()) => match self.supervisor.begin_step(&mut state) {
                        Some(decision) => Some(self.settle(&mut state, decision).await),
                        None => None,
                    },
                }
            };

            // The router may be slow; member actions must not wait on it, so it
            // sees the state as of the lane release.
            let step = match step {
                Some(step) => step,
                None => {
                    let decision = self.supervisor.assisted(&state).await;
                    let _lane = self.engine.lanes().acquire(&trip_id).await;
                    match self.sync(&mut state).await {
                        Err(message) => Step::Fail(message),
                        Ok(()) => {
                            // Member input that arrived meanwhile wins over the proposal.
                            let decision = self.supervisor.deterministic(&state).unwrap_or(decision);
                            self.settle(&mut state, decision).await
                        }
                    }
                }
            };

            match step {
                Step::Invoke(key) => {
                    if let Err(message) = self.invoke(&mut state, &key).await {
                        return self.fail(&mut state, message).await;
                    }
                    self.checkpoint(&state).await;
                }
                Step::Exit { status, reason } => {
                    info!(trip_id = %trip_id, %status, steps = state.steps, "Run exited: {}", reason);
                    if status == RunStatus::Completed {
                        self.engine.lanes().forget(&trip_id);
                    }
                    self.publish_status(&trip_id, status, Some(reason)).await;
                    return status;
                }
                Step::Fail(message) => return self.fail(&mut state, message).await,
            }
        }
    }

    async fn sync(&self, state: &mut WorkflowState) -> Result<(), String> {
        let trip = self
            .repo
            .load_trip(&state.trip_id)
            .await
            .map_err(|e| format!("Trip {} could not be loaded: {e}", state.trip_id))?;
        state.sync_from_trip(&trip);
        Ok(())
    }

    /// Record `decision` and turn it into the next step. Caller holds the lane.
    async fn settle(&self, state: &mut WorkflowState, decision: RoutingDecision) -> Step {
        let decision = self.supervisor.record(state, decision);
        let pause = decision.is_pause();
        match decision.next {
            NextTask::Worker(key) => Step::Invoke(key),
            NextTask::End => {
                let status = if pause {
                    RunStatus::Paused
                } else {
                    RunStatus::Completed
                };
                // Both under the lane: a member action that follows must
                // see the pause and its checkpoint.
                self.checkpoint(state).await;
                self.runs.set(&state.trip_id, status);
                Step::Exit {
                    status,
                    reason: decision.reason,
                }
            }
        }
    }

    async fn invoke(&self, state: &mut WorkflowState, key: &RouteKey) -> Result<(), String> {
        let Some(descriptor) = self.supervisor.registry().get(key) else {
            return Err(format!("No worker registered for {key}"));
        };
        let worker = Arc::clone(&descriptor.worker);
        let trip_id = state.trip_id.clone();
        let step = state.steps;
        let progress = (step as f32 / self.supervisor.max_steps() as f32).min(1.0);
        let agent_status = |status| TripEvent::AgentStatus {
            agent: key.to_string(),
            status,
            step,
            progress,
        };

        self.publish(&trip_id, agent_status(AgentActivity::Started)).await;
        debug!(trip_id = %trip_id, worker = %key, step, "Invoking worker");

        let update = match worker.invoke(state).await {
            Ok(update) => update,
            Err(e) => {
                self.publish(&trip_id, agent_status(AgentActivity::Failed)).await;
                return Err(format!("{key} failed: {e}"));
            }
        };

        let activity = if update.has_warnings() {
            AgentActivity::CompletedWithWarnings
        } else {
            AgentActivity::Completed
        };
        for warning in &update.data.warnings {
            warn!(trip_id = %trip_id, worker = %key, "{}", warning);
            self.publish(&trip_id, TripEvent::warning(warning.clone())).await;
        }

        if let Some(phase) = state.apply(update) {
            self.engine
                .activate(&trip_id, phase, state.data.activity_catalog.as_ref())
                .await
                .map_err(|e| format!("Activating {phase} failed: {e}"))?;
        }
        self.publish(&trip_id, agent_status(activity)).await;
        Ok(())
    }

    async fn fail(&self, state: &mut WorkflowState, message: String) -> RunStatus {
        error!(trip_id = %state.trip_id, step = state.steps, "Run failed: {}", message);
        state.done = false;
        state.reason = Some(message.clone());
        state.record("run_supervisor", message.clone());
        self.runs.set(&state.trip_id, RunStatus::Error);
        self.checkpoint(state).await;
        self.engine.lanes().forget(&state.trip_id);
        self.publish(&state.trip_id, TripEvent::error(message.clone()))
            .await;
        self.publish_status(&state.trip_id, RunStatus::Error, Some(message))
            .await;
        RunStatus::Error
    }

    async fn checkpoint(&self, state: &WorkflowState) {
        if let Err(e) = self.checkpoints.save_checkpoint(state).await {
            warn!(trip_id = %state.trip_id, "Failed to save checkpoint: {}", e);
        }
    }

    async fn publish(&self, trip_id: &TripId, event: TripEvent) {
        publish_best_effort(self.notifier.as_ref(), trip_id, event).await;
    }

    async fn publish_status(&self, trip_id: &TripId, status: RunStatus, reason: Option<String>) {
        self.publish(trip_id, TripEvent::RunStatusChanged { status, reason })
            .await;
    }
}
