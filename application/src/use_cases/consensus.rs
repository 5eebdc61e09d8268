//! Consensus engine
//!
//! Owns every mutation of a trip's phase tracking. Each operation takes the
//! trip's lane, loads the trip, applies the phase rules, saves, and then
//! publishes the resulting events. Events are only published for state that
//! has been saved.

use super::lanes::TripLanes;
use crate::ports::notification::{NotificationSink, publish_best_effort};
use crate::ports::repository::{RepositoryError, TripRepository};
use crate::ports::tie_breaker::TieBreaker;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use tripsync_domain::{
    Activation, ActivityBallot, ActivityCatalog, BlockReason, DateRange, DomainError,
    OptionTally, Phase, PhaseStatus, Preference, PreferencesSummary, SelectionCaps, Stance, Trip,
    TripEvent, TripId, VoteOption, common_windows, has_any_availability, leading_options,
    select_activities,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{member} is not a member of trip {trip_id}")]
    NotAMember { trip_id: TripId, member: String },

    #[error("{0} is already completed")]
    PhaseCompleted(Phase),

    #[error("{0} is not accepting votes")]
    NotVoting(Phase),

    #[error("Activity voting is not open")]
    ActivityVotingClosed,
}

impl ConsensusError {
    /// Caused by the caller's input rather than by the engine or storage
    pub fn is_input_error(&self) -> bool {
        match self {
            ConsensusError::Repository(RepositoryError::TripNotFound(_)) => true,
            ConsensusError::Repository(_) => false,
            ConsensusError::Domain(e) => e.is_input_error(),
            _ => true,
        }
    }
}

/// What an engine call changed
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    /// Phases completed by this call, in order
    pub resolved: Vec<Phase>,
    /// A blocked phase was re-evaluated and is no longer blocked
    pub unblocked: bool,
    /// Trip as saved
    pub trip: Trip,
}

impl EngineOutcome {
    fn new(trip: Trip) -> Self {
        Self {
            resolved: Vec::new(),
            unblocked: false,
            trip,
        }
    }

    /// Whether a paused run may now be able to make progress
    pub fn progressed(&self) -> bool {
        !self.resolved.is_empty() || self.unblocked
    }
}

/// Mutable view of one trip during a lane-held operation
struct Session<'a> {
    trip: Trip,
    preferences: &'a [Preference],
    events: Vec<TripEvent>,
    resolved: Vec<Phase>,
    unblocked: bool,
    now: DateTime<Utc>,
}

impl Session<'_> {
    fn members(&self) -> &[String] {
        &self.trip.members
    }
}

pub struct ConsensusEngine {
    repo: Arc<dyn TripRepository>,
    notifier: Arc<dyn NotificationSink>,
    tie_breaker: Arc<dyn TieBreaker>,
    lanes: Arc<TripLanes>,
    default_trip_days: u32,
    selection: SelectionCaps,
}

impl ConsensusEngine {
    pub fn new(
        repo: Arc<dyn TripRepository>,
        notifier: Arc<dyn NotificationSink>,
        tie_breaker: Arc<dyn TieBreaker>,
        lanes: Arc<TripLanes>,
    ) -> Self {
        Self {
            repo,
            notifier,
            tie_breaker,
            lanes,
            default_trip_days: 7,
            selection: SelectionCaps::default(),
        }
    }

    pub fn with_default_trip_days(mut self, days: u32) -> Self {
        self.default_trip_days = days.max(1);
        self
    }

    pub fn with_selection(mut self, selection: SelectionCaps) -> Self {
        self.selection = selection;
        self
    }

    pub fn lanes(&self) -> &Arc<TripLanes> {
        &self.lanes
    }

    // ==================== Operations ====================

    /// Evaluate the current phase if it is active.
    pub async fn resolve_current(&self, trip_id: &TripId) -> Result<EngineOutcome, ConsensusError> {
        self.with_session(trip_id, |engine, session| {
            let Some((phase, status)) = session
                .trip
                .phase_tracking
                .as_ref()
                .and_then(|t| t.current())
                .map(|(p, d)| (p, d.status))
            else {
                debug!(trip_id = %session.trip.id, "No current phase to resolve");
                return Ok(());
            };
            if status == PhaseStatus::Active
                && let Some(next) = engine.evaluate(session, phase)?
            {
                engine.activate_and_settle(session, next)?;
            }
            Ok(())
        })
        .await
    }

    /// Request activation of `phase`.
    ///
    /// For activity voting, `catalog` seeds the ballots even if activation is
    /// queued behind an open phase.
    pub async fn activate(
        &self,
        trip_id: &TripId,
        phase: Phase,
        catalog: Option<&ActivityCatalog>,
    ) -> Result<EngineOutcome, ConsensusError> {
        self.with_session(trip_id, |engine, session| {
            if phase == Phase::ActivityVoting
                && let Some(catalog) = catalog
            {
                engine.seed_ballots(session, catalog);
            }
            engine.activate_and_settle(session, phase)
        })
        .await
    }

    /// Replace `member`'s ballot in a voting phase.
    ///
    /// Voting marks the member ready; an empty ballot withdraws both. The
    /// phase resolves once every member has voted and is ready.
    pub async fn submit_vote(
        &self,
        trip_id: &TripId,
        phase: Phase,
        member: &str,
        choices: &[String],
    ) -> Result<EngineOutcome, ConsensusError> {
        self.with_session(trip_id, |engine, session| {
            engine.ensure_member(session, member)?;
            let total_members = session.trip.members.len();
            let data = session.trip.tracking_mut().phase_mut(phase);
            match data.status {
                PhaseStatus::VotingInProgress => {}
                PhaseStatus::Completed => return Err(ConsensusError::PhaseCompleted(phase)),
                _ => return Err(ConsensusError::NotVoting(phase)),
            }
            data.cast_vote(phase, member, choices)?;
            if choices.is_empty() {
                data.unmark_ready(member);
            } else {
                data.mark_ready(member);
            }
            let event = TripEvent::VoteUpdate {
                phase,
                options: data.options.iter().map(OptionTally::from).collect(),
                voters: data.voters().len(),
                total_members,
            };
            session.events.push(event);
            info!(trip_id = %session.trip.id, phase = %phase, member, "Vote recorded");
            engine.try_finalize_vote(session, phase)
        })
        .await
    }

    /// Mark or unmark `member` as ready for `phase`.
    pub async fn set_ready(
        &self,
        trip_id: &TripId,
        phase: Phase,
        member: &str,
        ready: bool,
    ) -> Result<EngineOutcome, ConsensusError> {
        self.with_session(trip_id, |engine, session| {
            engine.ensure_member(session, member)?;
            let members = session.trip.members.clone();
            let tracking = session.trip.tracking_mut();
            let data = tracking.phase_mut(phase);
            if data.is_completed() {
                return Err(ConsensusError::PhaseCompleted(phase));
            }
            let changed = if ready {
                data.mark_ready(member)
            } else {
                data.unmark_ready(member)
            };
            let users_ready = data.ready_count(&members);
            let all_ready = data.all_ready(&members);
            session.events.push(TripEvent::PhaseReadyUpdate {
                phase,
                users_ready,
                total: members.len(),
                all_ready,
            });
            debug!(trip_id = %session.trip.id, phase = %phase, member, ready, changed, "Readiness updated");

            if !all_ready {
                return Ok(());
            }
            if phase.is_readiness_gated() {
                // A pending activity vote can resolve once its catalog is seeded.
                let seeded =
                    phase == Phase::ActivityVoting && !session.trip.activity_catalog.is_empty();
                let tracking = session.trip.tracking_mut();
                let current = tracking.current_phase == Some(phase);
                if current || (seeded && tracking.predecessors_completed(phase)) {
                    return engine.activate_and_settle(session, phase);
                }
                Ok(())
            } else {
                engine.try_finalize_vote(session, phase)
            }
        })
        .await
    }

    /// Record `member`'s stance on one activity.
    pub async fn cast_activity_vote(
        &self,
        trip_id: &TripId,
        member: &str,
        activity_id: &str,
        stance: Stance,
    ) -> Result<EngineOutcome, ConsensusError> {
        self.with_session(trip_id, |engine, session| {
            engine.ensure_member(session, member)?;
            if session
                .trip
                .phase_tracking
                .as_ref()
                .is_some_and(|t| t.is_completed(Phase::ActivityVoting))
            {
                return Err(ConsensusError::ActivityVotingClosed);
            }
            let ballot = session
                .trip
                .activity_ballots
                .get_mut(activity_id)
                .ok_or_else(|| DomainError::UnknownActivity(activity_id.to_string()))?;
            ballot.cast(member, stance);
            debug!(
                trip_id = %session.trip.id,
                member,
                activity_id,
                %stance,
                net = ballot.net_votes(),
                "Activity vote recorded"
            );
            Ok(())
        })
        .await
    }

    /// Re-run date selection after members resubmitted availability.
    ///
    /// Only an active date phase is re-evaluated; a vote already in progress
    /// is left alone.
    pub async fn reevaluate_dates(&self, trip_id: &TripId) -> Result<EngineOutcome, ConsensusError> {
        self.with_session(trip_id, |engine, session| {
            let tracking = session.trip.tracking_mut();
            if tracking.status(Phase::DateSelection) != PhaseStatus::Active {
                return Ok(());
            }
            let was_blocked = tracking.phase_mut(Phase::DateSelection).blocked.take().is_some();
            let next = engine.evaluate(session, Phase::DateSelection)?;
            let still_blocked = session
                .trip
                .tracking_mut()
                .phase_mut(Phase::DateSelection)
                .blocked
                .is_some();
            session.unblocked = was_blocked && !still_blocked;
            if let Some(next) = next {
                engine.activate_and_settle(session, next)?;
            }
            Ok(())
        })
        .await
    }

    // ==================== Session plumbing ====================

    async fn with_session<F>(&self, trip_id: &TripId, op: F) -> Result<EngineOutcome, ConsensusError>
    where
        F: FnOnce(&Self, &mut Session<'_>) -> Result<(), ConsensusError>,
    {
        let _lane = self.lanes.acquire(trip_id).await;
        let trip = self.repo.load_trip(trip_id).await?;
        let preferences = self.repo.load_preferences(trip_id).await?;
        let mut session = Session {
            trip,
            preferences: &preferences,
            events: Vec::new(),
            resolved: Vec::new(),
            unblocked: false,
            now: Utc::now(),
        };

        op(self, &mut session)?;
        session.trip.sync_status();
        self.repo.save_trip(&session.trip).await?;

        for event in session.events {
            publish_best_effort(self.notifier.as_ref(), trip_id, event).await;
        }
        let mut outcome = EngineOutcome::new(session.trip);
        outcome.resolved = session.resolved;
        outcome.unblocked = session.unblocked;
        Ok(outcome)
    }

    fn ensure_member(&self, session: &Session<'_>, member: &str) -> Result<(), ConsensusError> {
        if session.trip.is_member(member) {
            Ok(())
        } else {
            Err(ConsensusError::NotAMember {
                trip_id: session.trip.id.clone(),
                member: member.to_string(),
            })
        }
    }

    // ==================== Phase rules ====================

    /// Activate `phase` and keep settling: an activated phase whose outcome
    /// is already determinable resolves at once, which may activate the next.
    fn activate_and_settle(&self, session: &mut Session<'_>, phase: Phase) -> Result<(), ConsensusError> {
        let mut next = Some(phase);
        while let Some(phase) = next.take() {
            let activation = session.trip.tracking_mut().activate(phase, session.now)?;
            debug!(trip_id = %session.trip.id, phase = %phase, ?activation, "Activation requested");
            if !matches!(activation, Activation::Activated | Activation::AlreadyCurrent) {
                break;
            }
            if session.trip.tracking_mut().status(phase) != PhaseStatus::Active {
                break;
            }
            // Destination tallies wait for the resolver step.
            if phase == Phase::DestinationDecision {
                break;
            }
            next = self.evaluate(session, phase)?;
        }
        Ok(())
    }

    /// Apply the phase's rule to an active phase.
    ///
    /// Returns the phase to activate next, if the phase completed.
    fn evaluate(&self, session: &mut Session<'_>, phase: Phase) -> Result<Option<Phase>, ConsensusError> {
        match phase {
            Phase::DestinationDecision => self.evaluate_destination(session),
            Phase::DateSelection => self.evaluate_dates(session),
            Phase::ActivityVoting | Phase::ItineraryApproval => {
                let data = session.trip.tracking_mut().phase_mut(phase).clone();
                if data.all_ready(session.members()) {
                    self.complete_readiness_phase(session, phase)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn evaluate_destination(&self, session: &mut Session<'_>) -> Result<Option<Phase>, ConsensusError> {
        let phase = Phase::DestinationDecision;
        let summary = PreferencesSummary::aggregate(session.members(), session.preferences);
        let top = summary.top_destinations();

        match top.as_slice() {
            [] => {
                let fallback = summary
                    .suggested_destination
                    .clone()
                    .unwrap_or_else(|| tripsync_domain::destination_for_vibe(None).to_string());
                let rationale = format!("no member named a destination; suggesting {fallback}");
                self.complete(session, phase, Some(fallback), rationale)
            }
            [winner] => {
                let rationale = format!(
                    "most requested destination ({} of {} members)",
                    winner.count,
                    session.trip.members.len()
                );
                let label = winner.label.clone();
                self.complete(session, phase, Some(label), rationale)
            }
            tied => {
                let options: Vec<VoteOption> = tied
                    .iter()
                    .map(|d| VoteOption::new(d.value.clone(), d.label.clone()))
                    .collect();
                let message = format!(
                    "{} destinations are tied; every member please vote",
                    options.len()
                );
                self.open_vote(session, phase, options, message)?;
                Ok(None)
            }
        }
    }

    fn evaluate_dates(&self, session: &mut Session<'_>) -> Result<Option<Phase>, ConsensusError> {
        let phase = Phase::DateSelection;
        let latest: BTreeMap<&str, &Preference> = session
            .preferences
            .iter()
            .map(|p| (p.member_id.as_str(), p))
            .collect();
        let per_member: Vec<Vec<DateRange>> = session
            .trip
            .members
            .iter()
            .map(|m| {
                latest
                    .get(m.as_str())
                    .map(|p| p.available_dates.clone())
                    .unwrap_or_default()
            })
            .collect();

        if !has_any_availability(&per_member) {
            session.trip.selected_dates = None;
            session.trip.trip_duration_days = Some(self.default_trip_days);
            let rationale = format!(
                "no availability submitted; planning a {}-day trip",
                self.default_trip_days
            );
            return self.complete(session, phase, None, rationale);
        }

        let windows = common_windows(&per_member);
        let data = session.trip.tracking_mut().phase_mut(phase);
        data.candidates = windows.iter().map(DateRange::token).collect();

        match windows.as_slice() {
            [] => {
                data.blocked = Some(BlockReason::IncompatibleDates);
                warn!(trip_id = %session.trip.id, "No compatible dates across members");
                session.events.push(TripEvent::warning(
                    "No compatible dates: members' availability does not overlap. \
                     Please resubmit availability.",
                ));
                Ok(None)
            }
            [range] => {
                let range = *range;
                self.apply_dates(session, range);
                let rationale = format!("only range every member can make: {}", range.label());
                self.complete(session, phase, Some(range.token()), rationale)
            }
            several => {
                let options = several
                    .iter()
                    .map(|r| VoteOption::new(r.token(), r.label()))
                    .collect();
                let message = format!("{} date ranges work for everyone; please vote", several.len());
                self.open_vote(session, phase, options, message)?;
                Ok(None)
            }
        }
    }

    fn apply_dates(&self, session: &mut Session<'_>, range: DateRange) {
        session.trip.selected_dates = Some(range);
        session.trip.trip_duration_days = Some(range.days());
    }

    fn open_vote(
        &self,
        session: &mut Session<'_>,
        phase: Phase,
        options: Vec<VoteOption>,
        message: String,
    ) -> Result<(), ConsensusError> {
        let now = session.now;
        let data = session.trip.tracking_mut().phase_mut(phase);
        data.options = options;
        data.transition(phase, PhaseStatus::VotingInProgress, now)?;
        let tallies = data.options.iter().map(OptionTally::from).collect();
        info!(trip_id = %session.trip.id, phase = %phase, "Voting opened");
        session.events.push(TripEvent::VotingPrompt {
            phase,
            options: tallies,
            message,
        });
        Ok(())
    }

    fn try_finalize_vote(&self, session: &mut Session<'_>, phase: Phase) -> Result<(), ConsensusError> {
        let members = session.trip.members.clone();
        let data = session.trip.tracking_mut().phase_mut(phase).clone();
        if data.status != PhaseStatus::VotingInProgress
            || !data.all_voted(&members)
            || !data.all_ready(&members)
        {
            return Ok(());
        }

        let leaders = leading_options(&data.options);
        let (winner, rationale) = match leaders.as_slice() {
            [single] => (
                (*single).clone(),
                format!("won the vote with {} of {} votes", single.votes(), members.len()),
            ),
            tied => {
                let pool: Vec<&VoteOption> = if tied.is_empty() {
                    data.options.iter().collect()
                } else {
                    tied.to_vec()
                };
                let values: Vec<String> = pool.iter().map(|o| o.value.clone()).collect();
                let picked = self
                    .tie_breaker
                    .pick(&values)
                    .and_then(|v| pool.iter().find(|o| o.value == v).map(|o| (*o).clone()));
                let Some(picked) = picked else {
                    warn!(trip_id = %session.trip.id, phase = %phase, "Tie-break returned no valid option");
                    return Ok(());
                };
                let labels: Vec<&str> = pool.iter().map(|o| o.label.as_str()).collect();
                (picked, format!("tie between {} broken at random", labels.join(", ")))
            }
        };

        let others: Vec<String> = data
            .voters()
            .into_iter()
            .filter(|m| !winner.has_voter(m))
            .map(str::to_string)
            .collect();
        session
            .trip
            .tracking_mut()
            .fairness
            .record(winner.voters.iter().map(String::as_str), others.iter().map(String::as_str));

        let decision = match phase {
            Phase::DestinationDecision => Some(winner.label.clone()),
            Phase::DateSelection => {
                let range: DateRange = winner.value.parse()?;
                self.apply_dates(session, range);
                Some(range.token())
            }
            _ => Some(winner.value.clone()),
        };
        if let Some(next) = self.complete(session, phase, decision, rationale)? {
            self.activate_and_settle(session, next)?;
        }
        Ok(())
    }

    fn complete_readiness_phase(
        &self,
        session: &mut Session<'_>,
        phase: Phase,
    ) -> Result<Option<Phase>, ConsensusError> {
        match phase {
            Phase::ActivityVoting => {
                let selected = select_activities(
                    &session.trip.activity_catalog,
                    &session.trip.activity_ballots,
                    self.selection,
                );
                let rationale = format!(
                    "{} of {} activities selected by group vote",
                    selected.len(),
                    session.trip.activity_catalog.len()
                );
                session.trip.selected_activities = selected;
                self.complete(session, phase, None, rationale)
            }
            _ => self.complete(session, phase, None, "all members approved".to_string()),
        }
    }

    /// Mark `phase` completed and report which phase comes next.
    fn complete(
        &self,
        session: &mut Session<'_>,
        phase: Phase,
        decision: Option<String>,
        rationale: String,
    ) -> Result<Option<Phase>, ConsensusError> {
        let now = session.now;
        let tracking = session.trip.tracking_mut();
        let data = tracking.phase_mut(phase);
        data.decision = decision.clone();
        data.rationale = Some(rationale.clone());
        let queued = tracking.complete(phase, now)?;

        if phase == Phase::DestinationDecision
            && let Some(destination) = &decision
        {
            session.trip.destination = Some(destination.clone());
        }

        info!(trip_id = %session.trip.id, phase = %phase, ?decision, "Phase resolved: {}", rationale);
        session.resolved.push(phase);
        session.events.push(TripEvent::PhaseResolved {
            phase,
            decision,
            rationale,
        });

        // Dates always follow the destination; later phases wait for their
        // worker to request activation.
        let next = if phase == Phase::DestinationDecision {
            Some(Phase::DateSelection)
        } else {
            queued
        };
        Ok(next)
    }

    fn seed_ballots(&self, session: &mut Session<'_>, catalog: &ActivityCatalog) {
        if session
            .trip
            .phase_tracking
            .as_ref()
            .is_some_and(|t| t.is_completed(Phase::ActivityVoting))
        {
            return;
        }
        session.trip.activity_catalog = catalog.activities.clone();
        session
            .trip
            .activity_ballots
            .retain(|id, _| catalog.activities.iter().any(|a| &a.id == id));
        for activity in &catalog.activities {
            session
                .trip
                .activity_ballots
                .entry(activity.id.clone())
                .or_insert_with(ActivityBallot::default);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::testing::{MemoryRepo, RecordingNotifier};
    use std::sync::Mutex;
    use tripsync_domain::Activity;

    /// Always picks the last tied value and remembers what it was offered
    #[derive(Default)]
    struct LastTieBreaker {
        offered: Mutex<Vec<Vec<String>>>,
    }

    impl TieBreaker for LastTieBreaker {
        fn pick(&self, tied: &[String]) -> Option<String> {
            self.offered.lock().unwrap().push(tied.to_vec());
            tied.last().cloned()
        }
    }

    struct Fixture {
        repo: Arc<MemoryRepo>,
        notifier: Arc<RecordingNotifier>,
        tie_breaker: Arc<LastTieBreaker>,
        engine: ConsensusEngine,
        trip_id: TripId,
    }

    fn fixture(members: &[&str]) -> Fixture {
        fixture_with(members, false)
    }

    fn fixture_with(members: &[&str], failing_notifier: bool) -> Fixture {
        let repo = Arc::new(MemoryRepo::default());
        let notifier = Arc::new(if failing_notifier {
            RecordingNotifier::failing()
        } else {
            RecordingNotifier::default()
        });
        let tie_breaker = Arc::new(LastTieBreaker::default());
        let trip_id = TripId::new("t1");
        let trip = Trip::new(
            trip_id.clone(),
            "Summer",
            members.iter().map(|m| m.to_string()).collect(),
        );
        repo.insert_trip(trip);
        let engine = ConsensusEngine::new(
            repo.clone(),
            notifier.clone(),
            tie_breaker.clone(),
            Arc::new(TripLanes::new()),
        )
        .with_default_trip_days(5);
        Fixture {
            repo,
            notifier,
            tie_breaker,
            engine,
            trip_id,
        }
    }

    impl Fixture {
        fn prefer(&self, member: &str, destination: &str, dates: &[&str]) {
            let pref = Preference::new(self.trip_id.clone(), member)
                .with_destination(destination)
                .with_availability(dates.iter().map(|d| d.parse().unwrap()).collect());
            self.repo.insert_preference(pref);
        }

        fn trip(&self) -> Trip {
            self.repo.trip(&self.trip_id)
        }

        fn status(&self, phase: Phase) -> PhaseStatus {
            self.trip().phase_tracking.unwrap().status(phase)
        }

        async fn start_destination(&self) -> EngineOutcome {
            self.engine
                .activate(&self.trip_id, Phase::DestinationDecision, None)
                .await
                .unwrap();
            self.engine.resolve_current(&self.trip_id).await.unwrap()
        }

        async fn vote(&self, phase: Phase, member: &str, choice: &str) -> EngineOutcome {
            self.engine
                .submit_vote(&self.trip_id, phase, member, &[choice.to_string()])
                .await
                .unwrap()
        }

        fn events(&self) -> Vec<TripEvent> {
            self.notifier.events()
        }
    }

    #[tokio::test]
    async fn test_majority_resolves_without_vote() {
        let f = fixture(&["m1", "m2", "m3"]);
        f.prefer("m1", "A", &[]);
        f.prefer("m2", "a", &[]);
        f.prefer("m3", "B", &[]);

        let outcome = f.start_destination().await;

        // no availability at all: dates resolve straight away with the default length
        assert_eq!(
            outcome.resolved,
            vec![Phase::DestinationDecision, Phase::DateSelection]
        );
        let trip = f.trip();
        assert_eq!(trip.destination.as_deref(), Some("A"));
        assert_eq!(trip.trip_duration_days, Some(5));
        assert!(trip.selected_dates.is_none());
        let tracking = trip.phase_tracking.unwrap();
        assert!(tracking.phase(Phase::DestinationDecision).unwrap().options.is_empty());
        assert!(tracking.current_phase.is_none());
        assert!(!f.events().iter().any(|e| matches!(e, TripEvent::VotingPrompt { .. })));
    }

    #[tokio::test]
    async fn test_tie_waits_for_every_member_then_majority() {
        let f = fixture(&["m1", "m2", "m3", "m4"]);
        for (m, d) in [("m1", "A"), ("m2", "A"), ("m3", "B"), ("m4", "B")] {
            f.prefer(m, d, &[]);
        }

        let outcome = f.start_destination().await;
        assert!(outcome.resolved.is_empty());
        assert_eq!(f.status(Phase::DestinationDecision), PhaseStatus::VotingInProgress);
        let options: Vec<String> = f.trip().phase_tracking.unwrap().phase(Phase::DestinationDecision)
            .unwrap()
            .options
            .iter()
            .map(|o| o.value.clone())
            .collect();
        assert_eq!(options, vec!["a", "b"]);
        assert!(f.events().iter().any(|e| matches!(e, TripEvent::VotingPrompt { .. })));

        f.vote(Phase::DestinationDecision, "m1", "A").await;
        f.vote(Phase::DestinationDecision, "m2", "A").await;
        let outcome = f.vote(Phase::DestinationDecision, "m3", "B").await;
        assert!(outcome.resolved.is_empty(), "3 of 4 members must not resolve");

        let outcome = f.vote(Phase::DestinationDecision, "m4", "a").await;
        assert_eq!(outcome.resolved[0], Phase::DestinationDecision);
        assert_eq!(f.trip().destination.as_deref(), Some("A"));
        assert!(f.tie_breaker.offered.lock().unwrap().is_empty());

        let fairness = f.trip().phase_tracking.unwrap().fairness;
        assert_eq!(fairness.members["m1"].wins, 1);
        assert_eq!(fairness.members["m3"].compromises, 1);
    }

    #[tokio::test]
    async fn test_still_tied_picks_only_among_tied() {
        let f = fixture(&["m1", "m2", "m3", "m4"]);
        for (m, d) in [("m1", "A"), ("m2", "A"), ("m3", "B"), ("m4", "B")] {
            f.prefer(m, d, &[]);
        }
        f.start_destination().await;
        for (m, d) in [("m1", "A"), ("m2", "A"), ("m3", "B"), ("m4", "B")] {
            f.vote(Phase::DestinationDecision, m, d).await;
        }

        assert_eq!(
            *f.tie_breaker.offered.lock().unwrap(),
            vec![vec!["a".to_string(), "b".to_string()]]
        );
        assert_eq!(f.trip().destination.as_deref(), Some("B"));
        assert_eq!(f.status(Phase::DestinationDecision), PhaseStatus::Completed);
    }

    #[tokio::test]
    async fn test_repeated_votes_are_idempotent() {
        let f = fixture(&["m1", "m2", "m3"]);
        f.prefer("m1", "A", &[]);
        f.prefer("m2", "B", &[]);
        f.start_destination().await;

        for _ in 0..3 {
            f.vote(Phase::DestinationDecision, "m1", "A").await;
        }
        let trip = f.trip();
        let data = trip.phase_tracking.as_ref().unwrap().phase(Phase::DestinationDecision).unwrap();
        assert_eq!(data.options[0].votes(), 1);
        assert_eq!(data.users_ready.len(), 1);
    }

    #[tokio::test]
    async fn test_vote_rejections() {
        let f = fixture(&["m1", "m2"]);
        f.prefer("m1", "A", &[]);
        f.prefer("m2", "B", &[]);

        let err = f
            .engine
            .submit_vote(&f.trip_id, Phase::DestinationDecision, "m1", &["A".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err, ConsensusError::NotVoting(Phase::DestinationDecision));

        f.start_destination().await;
        let err = f
            .engine
            .submit_vote(&f.trip_id, Phase::DestinationDecision, "intruder", &["A".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::NotAMember { .. }));
        assert!(err.is_input_error());

        let err = f
            .engine
            .submit_vote(&f.trip_id, Phase::DestinationDecision, "m1", &["Z".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::Domain(DomainError::UnknownOption { .. })));
    }

    #[tokio::test]
    async fn test_disjoint_dates_block_until_resubmitted() {
        let f = fixture(&["m1", "m2"]);
        f.prefer("m1", "Rome", &["2024-06-01:06-05"]);
        f.prefer("m2", "Rome", &["2024-06-10:06-15"]);

        let outcome = f.start_destination().await;
        assert_eq!(outcome.resolved, vec![Phase::DestinationDecision]);
        let trip = f.trip();
        assert!(trip.selected_dates.is_none());
        let dates = trip.phase_tracking.as_ref().unwrap().phase(Phase::DateSelection).unwrap();
        assert_eq!(dates.status, PhaseStatus::Active);
        assert_eq!(dates.blocked, Some(BlockReason::IncompatibleDates));
        assert!(f.events().iter().any(|e| matches!(
            e,
            TripEvent::Announcement { message, .. } if message.contains("No compatible dates")
        )));

        // without new availability it stays blocked
        let outcome = f.engine.resolve_current(&f.trip_id).await.unwrap();
        assert!(outcome.resolved.is_empty());

        let fixed = Preference::new(f.trip_id.clone(), "m2")
            .with_destination("Rome")
            .with_availability(vec!["2024-06-03:2024-06-12".parse().unwrap()]);
        f.repo.save_preference(&fixed).await.unwrap();
        let outcome = f.engine.reevaluate_dates(&f.trip_id).await.unwrap();

        assert!(outcome.unblocked);
        assert_eq!(outcome.resolved, vec![Phase::DateSelection]);
        let trip = f.trip();
        assert_eq!(trip.selected_dates.unwrap().token(), "2024-06-03:2024-06-05");
        assert_eq!(trip.trip_duration_days, Some(3));
    }

    #[tokio::test]
    async fn test_several_overlaps_go_to_vote() {
        let f = fixture(&["m1", "m2"]);
        f.prefer("m1", "Rome", &["2024-06-01:06-05", "2024-07-01:07-05"]);
        f.prefer("m2", "Rome", &["2024-06-01:07-31"]);

        f.start_destination().await;
        assert_eq!(f.status(Phase::DateSelection), PhaseStatus::VotingInProgress);

        f.vote(Phase::DateSelection, "m1", "2024-07-01:2024-07-05").await;
        let outcome = f.vote(Phase::DateSelection, "m2", "2024-07-01:2024-07-05").await;
        assert_eq!(outcome.resolved, vec![Phase::DateSelection]);
        assert_eq!(outcome.trip.trip_duration_days, Some(5));
    }

    fn catalog() -> ActivityCatalog {
        ActivityCatalog {
            destination: "Rome".to_string(),
            activities: vec![
                Activity::new("colosseum", "Colosseum", "culture").with_base_score(0.9),
                Activity::new("pasta", "Pasta class", "food").with_base_score(0.6),
            ],
            generated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_activity_voting_queued_behind_dates() {
        let f = fixture(&["m1", "m2"]);
        f.prefer("m1", "Rome", &["2024-06-01:06-05", "2024-07-01:07-05"]);
        f.prefer("m2", "Rome", &["2024-06-01:07-31"]);
        f.start_destination().await;

        let outcome = f
            .engine
            .activate(&f.trip_id, Phase::ActivityVoting, Some(&catalog()))
            .await
            .unwrap();
        let tracking = outcome.trip.phase_tracking.unwrap();
        assert!(tracking.phase(Phase::ActivityVoting).unwrap().queued);
        assert_eq!(tracking.current_phase, Some(Phase::DateSelection));
        assert_eq!(outcome.trip.activity_ballots.len(), 2);

        f.vote(Phase::DateSelection, "m1", "2024-06-01:2024-06-05").await;
        let outcome = f.vote(Phase::DateSelection, "m2", "2024-06-01:2024-06-05").await;
        let tracking = outcome.trip.phase_tracking.unwrap();
        assert_eq!(tracking.current_phase, Some(Phase::ActivityVoting));
        assert_eq!(tracking.status(Phase::ActivityVoting), PhaseStatus::Active);
    }

    #[tokio::test]
    async fn test_activity_selection_on_readiness() {
        let f = fixture(&["m1", "m2"]);
        f.start_destination().await;
        f.engine
            .activate(&f.trip_id, Phase::ActivityVoting, Some(&catalog()))
            .await
            .unwrap();

        for member in ["m1", "m2"] {
            f.engine
                .cast_activity_vote(&f.trip_id, member, "pasta", Stance::Up)
                .await
                .unwrap();
        }
        f.engine
            .cast_activity_vote(&f.trip_id, "m1", "colosseum", Stance::Down)
            .await
            .unwrap();
        let err = f
            .engine
            .cast_activity_vote(&f.trip_id, "m1", "skydiving", Stance::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::Domain(DomainError::UnknownActivity(_))));

        let outcome = f
            .engine
            .set_ready(&f.trip_id, Phase::ActivityVoting, "m1", true)
            .await
            .unwrap();
        assert!(!outcome.progressed());
        let outcome = f
            .engine
            .set_ready(&f.trip_id, Phase::ActivityVoting, "m2", true)
            .await
            .unwrap();
        assert_eq!(outcome.resolved, vec![Phase::ActivityVoting]);
        let selected: Vec<_> = outcome
            .trip
            .selected_activities
            .iter()
            .map(|s| s.activity_id.as_str())
            .collect();
        assert_eq!(selected, vec!["pasta"]);

        let err = f
            .engine
            .cast_activity_vote(&f.trip_id, "m1", "pasta", Stance::Clear)
            .await
            .unwrap_err();
        assert_eq!(err, ConsensusError::ActivityVotingClosed);
    }

    #[tokio::test]
    async fn test_pending_activity_vote_resolves_on_readiness() {
        let f = fixture(&["m1", "m2"]);
        f.start_destination().await;
        // catalog present but activation never requested
        f.repo.update_trip(&f.trip_id, |trip| {
            trip.activity_catalog = catalog().activities;
        });
        assert_eq!(f.status(Phase::ActivityVoting), PhaseStatus::Pending);

        f.engine
            .set_ready(&f.trip_id, Phase::ActivityVoting, "m1", true)
            .await
            .unwrap();
        let outcome = f
            .engine
            .set_ready(&f.trip_id, Phase::ActivityVoting, "m2", true)
            .await
            .unwrap();
        assert_eq!(outcome.resolved, vec![Phase::ActivityVoting]);
        assert_eq!(f.status(Phase::ActivityVoting), PhaseStatus::Completed);
    }

    #[tokio::test]
    async fn test_itinerary_approval_completes_trip() {
        let f = fixture(&["m1", "m2"]);
        f.start_destination().await;
        f.engine
            .activate(&f.trip_id, Phase::ActivityVoting, Some(&catalog()))
            .await
            .unwrap();
        for m in ["m1", "m2"] {
            f.engine
                .set_ready(&f.trip_id, Phase::ActivityVoting, m, true)
                .await
                .unwrap();
        }
        f.engine
            .activate(&f.trip_id, Phase::ItineraryApproval, None)
            .await
            .unwrap();
        assert_eq!(f.trip().status, tripsync_domain::TripStatus::Consensus);

        f.engine
            .set_ready(&f.trip_id, Phase::ItineraryApproval, "m1", true)
            .await
            .unwrap();
        f.engine
            .set_ready(&f.trip_id, Phase::ItineraryApproval, "m1", false)
            .await
            .unwrap();
        f.engine
            .set_ready(&f.trip_id, Phase::ItineraryApproval, "m2", true)
            .await
            .unwrap();
        assert_eq!(f.status(Phase::ItineraryApproval), PhaseStatus::Active);

        let outcome = f
            .engine
            .set_ready(&f.trip_id, Phase::ItineraryApproval, "m1", true)
            .await
            .unwrap();
        assert_eq!(outcome.resolved, vec![Phase::ItineraryApproval]);
        assert_eq!(outcome.trip.status, tripsync_domain::TripStatus::Complete);

        let err = f
            .engine
            .set_ready(&f.trip_id, Phase::ItineraryApproval, "m1", true)
            .await
            .unwrap_err();
        assert_eq!(err, ConsensusError::PhaseCompleted(Phase::ItineraryApproval));
    }

    #[tokio::test]
    async fn test_failed_publish_does_not_fail_transition() {
        let f = fixture_with(&["m1"], true);
        f.prefer("m1", "Oslo", &[]);
        let outcome = f.start_destination().await;
        assert!(outcome.progressed());
        assert_eq!(f.trip().destination.as_deref(), Some("Oslo"));
        assert!(!f.events().is_empty());
    }

    #[tokio::test]
    async fn test_missing_trip_is_repository_error() {
        let f = fixture(&["m1"]);
        let err = f
            .engine
            .resolve_current(&TripId::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConsensusError::Repository(RepositoryError::TripNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_votes_and_readiness_are_serialized() {
        let members = ["m1", "m2", "m3", "m4", "m5", "m6"];
        let f = fixture(&members);
        for (i, m) in members.iter().enumerate() {
            f.prefer(m, if i % 2 == 0 { "A" } else { "B" }, &[]);
        }
        f.start_destination().await;
        assert_eq!(f.status(Phase::DestinationDecision), PhaseStatus::VotingInProgress);

        let Fixture {
            repo,
            engine,
            trip_id,
            ..
        } = f;
        let engine = Arc::new(engine);
        let tasks: Vec<_> = members
            .iter()
            .map(|m| {
                let engine = Arc::clone(&engine);
                let trip_id = trip_id.clone();
                let member = m.to_string();
                tokio::spawn(async move {
                    // readiness toggled alongside the vote must not clobber it
                    engine
                        .set_ready(&trip_id, Phase::DestinationDecision, &member, true)
                        .await
                        .unwrap();
                    engine
                        .submit_vote(&trip_id, Phase::DestinationDecision, &member, &["b".to_string()])
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut resolutions = 0;
        for task in tasks {
            let outcome = task.await.unwrap();
            if outcome.resolved.contains(&Phase::DestinationDecision) {
                resolutions += 1;
            }
        }
        assert_eq!(resolutions, 1);

        let trip = repo.trip(&trip_id);
        assert_eq!(trip.destination.as_deref(), Some("B"));
        let tracking = trip.phase_tracking.unwrap();
        let data = tracking.phase(Phase::DestinationDecision).unwrap();
        let total: usize = data.options.iter().map(|o| o.votes()).sum();
        assert_eq!(total, members.len());
        assert_eq!(data.users_ready.len(), members.len());
    }
}
