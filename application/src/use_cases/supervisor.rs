//! Supervisor routing
//!
//! Picks the next worker for a run. Deterministic rules are tried first, in
//! fixed priority order; the assistive [`RoutingStrategy`] is consulted only
//! when none of them applies, and whatever it proposes is validated against
//! the registry.

use super::registry::WorkerRegistry;
use crate::ports::routing::RoutingStrategy;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tripsync_domain::{NextTask, Phase, PhaseStatus, RouteKey, WorkflowState};

/// Which rule produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    StepCap,
    PreferencesMissing,
    PhaseNeedsResolution,
    ResearchMissing,
    ItineraryMissing,
    WaitingForMembers,
    PipelineComplete,
    Assisted,
    /// Assistive proposal was invalid and replaced
    Coerced,
}

/// Outcome of one supervisor step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub next: NextTask,
    /// True only when the run is finished, not merely paused
    pub done: bool,
    pub reason: String,
    pub source: DecisionSource,
}

impl RoutingDecision {
    fn worker(key: RouteKey, reason: impl Into<String>, source: DecisionSource) -> Self {
        Self {
            next: NextTask::Worker(key),
            done: false,
            reason: reason.into(),
            source,
        }
    }

    fn end(done: bool, reason: impl Into<String>, source: DecisionSource) -> Self {
        Self {
            next: NextTask::End,
            done,
            reason: reason.into(),
            source,
        }
    }

    /// The run should stop and wait for members rather than finish
    pub fn is_pause(&self) -> bool {
        self.next.is_end() && !self.done && self.source == DecisionSource::WaitingForMembers
    }
}

pub struct Supervisor {
    registry: Arc<WorkerRegistry>,
    strategy: Arc<dyn RoutingStrategy>,
    max_steps: u32,
}

impl Supervisor {
    pub fn new(
        registry: Arc<WorkerRegistry>,
        strategy: Arc<dyn RoutingStrategy>,
        max_steps: u32,
    ) -> Self {
        Self {
            registry,
            strategy,
            max_steps: max_steps.max(1),
        }
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Take one routing step.
    ///
    /// Increments the step counter and records the decision on `state`.
    pub async fn decide(&self, state: &mut WorkflowState) -> RoutingDecision {
        let decision = match self.begin_step(state) {
            Some(decision) => decision,
            None => self.assisted(state).await,
        };
        self.record(state, decision)
    }

    /// First half of a step: count it and apply the step cap and the
    /// deterministic rules. `None` means the router must be consulted.
    pub fn begin_step(&self, state: &mut WorkflowState) -> Option<RoutingDecision> {
        state.steps += 1;
        if state.steps >= self.max_steps {
            return Some(RoutingDecision::end(
                true,
                format!("max steps reached ({})", self.max_steps),
                DecisionSource::StepCap,
            ));
        }
        self.deterministic(state)
    }

    /// Write `decision` onto `state` as the outcome of the current step.
    pub fn record(&self, state: &mut WorkflowState, decision: RoutingDecision) -> RoutingDecision {
        if let NextTask::Worker(key) = &decision.next
            && decision.source != DecisionSource::Assisted
            && decision.source != DecisionSource::Coerced
        {
            state.last_task = Some(key.clone());
        }
        state.next_task = Some(decision.next.clone());
        state.done = decision.done;
        state.reason = Some(decision.reason.clone());
        state.record("supervisor", format!("{} ({})", decision.next, decision.reason));

        info!(
            trip_id = %state.trip_id,
            step = state.steps,
            next = %decision.next,
            "Routing: {}",
            decision.reason
        );
        decision
    }

    /// Rules evaluated in priority order; `None` when none applies.
    pub fn deterministic(&self, state: &WorkflowState) -> Option<RoutingDecision> {
        let data = &state.data;
        let tracking = data.phase_tracking.as_ref();

        if data.preferences_summary.is_none() {
            return Some(self.route(
                RouteKey::PREFERENCE_PROCESSOR,
                "preferences not aggregated yet",
                DecisionSource::PreferencesMissing,
            ));
        }

        if let Some((phase, phase_data)) = tracking.and_then(|t| t.current())
            && phase_data.status == PhaseStatus::Active
            && phase_data.blocked.is_none()
            && (!phase.is_readiness_gated() || phase_data.all_ready(&state.members))
        {
            return Some(self.route(
                RouteKey::CONSENSUS_RESOLVER,
                format!("{} phase is active and can be resolved", phase),
                DecisionSource::PhaseNeedsResolution,
            ));
        }

        if data.destination.is_some() && data.activity_catalog.is_none() {
            return Some(self.route(
                RouteKey::DESTINATION_RESEARCHER,
                "destination set, activities not researched yet",
                DecisionSource::ResearchMissing,
            ));
        }

        if data.activity_catalog.is_some()
            && data.trip_duration_days.is_some()
            && data.itinerary.is_none()
            && tracking.is_some_and(|t| t.is_completed(Phase::ActivityVoting))
        {
            return Some(self.route(
                RouteKey::ITINERARY_PLANNER,
                "activities selected, itinerary not planned yet",
                DecisionSource::ItineraryMissing,
            ));
        }

        if tracking.is_some_and(|t| t.is_waiting_for_members()) {
            let phase = tracking
                .and_then(|t| t.current_phase)
                .unwrap_or(Phase::ActivityVoting);
            return Some(RoutingDecision::end(
                false,
                format!("waiting for members on {}", phase),
                DecisionSource::WaitingForMembers,
            ));
        }

        if tracking.is_some_and(|t| t.is_pipeline_complete()) {
            return Some(RoutingDecision::end(
                true,
                "trip planning complete",
                DecisionSource::PipelineComplete,
            ));
        }

        None
    }

    fn route(&self, key: RouteKey, why: impl Into<String>, source: DecisionSource) -> RoutingDecision {
        let why = why.into();
        let reason = match self.registry.get(&key) {
            Some(d) => format!("{why}; {key}: {}", d.description),
            None => why,
        };
        RoutingDecision::worker(key, reason, source)
    }

    /// Ask the assistive router, validating whatever it proposes.
    pub async fn assisted(&self, state: &WorkflowState) -> RoutingDecision {
        debug!(trip_id = %state.trip_id, "No deterministic rule applied, consulting router");
        let proposal = match self.strategy.propose(state, &self.registry.choices()).await {
            Ok(p) => p,
            Err(e) => {
                warn!(trip_id = %state.trip_id, "Assistive routing failed: {}", e);
                return self.coerce(state, format!("routing failed: {e}"));
            }
        };

        match NextTask::from(proposal.next_task.clone()) {
            NextTask::End => RoutingDecision::end(true, proposal.reason, DecisionSource::Assisted),
            NextTask::Worker(key) => match self.registry.get(&key) {
                Some(d) => RoutingDecision::worker(d.key.clone(), proposal.reason, DecisionSource::Assisted),
                None => {
                    warn!(
                        trip_id = %state.trip_id,
                        proposed = %proposal.next_task,
                        "Assistive router proposed an unregistered worker"
                    );
                    self.coerce(state, format!("unknown worker '{}'", proposal.next_task))
                }
            },
        }
    }

    // Fall back to the last deterministic suggestion, or end.
    fn coerce(&self, state: &WorkflowState, why: String) -> RoutingDecision {
        match state.last_task.as_ref().filter(|k| self.registry.contains(k)) {
            Some(key) => RoutingDecision::worker(
                key.clone(),
                format!("{why}; falling back to {key}"),
                DecisionSource::Coerced,
            ),
            None => RoutingDecision::end(true, format!("{why}; ending run"), DecisionSource::Coerced),
        }
    }
}
