//! Preference aggregation worker

use crate::ports::repository::TripRepository;
use crate::ports::worker::{Worker, WorkerError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use tripsync_domain::{
    AgentDataPatch, Patch, Phase, PreferencesSummary, RouteKey, StateUpdate, WorkflowState,
};

/// Folds every member's latest preference into a [`PreferencesSummary`]
/// and opens the destination decision.
pub struct PreferenceAggregator {
    repo: Arc<dyn TripRepository>,
}

impl PreferenceAggregator {
    pub fn new(repo: Arc<dyn TripRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Worker for PreferenceAggregator {
    fn name(&self) -> &str {
        RouteKey::PREFERENCE_PROCESSOR.as_str()
    }

    async fn invoke(&self, state: &WorkflowState) -> Result<StateUpdate, WorkerError> {
        let members = if state.members.is_empty() {
            self.repo.load_trip(&state.trip_id).await?.members
        } else {
            state.members.clone()
        };
        let preferences = self.repo.load_preferences(&state.trip_id).await?;
        let summary = PreferencesSummary::aggregate(&members, &preferences);

        let mut warnings: Vec<String> = summary.conflicts.clone();
        let missing = summary.member_count.saturating_sub(summary.respondents);
        if missing > 0 {
            warnings.push(format!(
                "{missing} of {} members have not submitted preferences",
                summary.member_count
            ));
        }

        info!(
            trip_id = %state.trip_id,
            respondents = summary.respondents,
            members = summary.member_count,
            ready = summary.ready_for_planning,
            "Preferences aggregated"
        );

        let message = format!(
            "Aggregated preferences from {} of {} members (coverage {:.0}%)",
            summary.respondents,
            summary.member_count,
            summary.coverage * 100.0
        );
        let mut update = StateUpdate::new()
            .with_message(self.name(), message)
            .with_activation(Phase::DestinationDecision);
        update.data = AgentDataPatch {
            preferences_summary: Patch::Set(summary),
            warnings,
            ..AgentDataPatch::default()
        };
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::testing::MemoryRepo;
    use tripsync_domain::{Preference, Trip, TripId};

    #[tokio::test]
    async fn test_aggregates_and_requests_destination_phase() {
        let repo = Arc::new(MemoryRepo::default());
        let trip_id = TripId::new("t1");
        repo.insert_trip(Trip::new(trip_id.clone(), "Spring", vec!["m1".into(), "m2".into()]));
        repo.insert_preference(
            Preference::new(trip_id.clone(), "m1")
                .with_destination("Lisbon")
                .with_budget(1),
        );
        repo.insert_preference(
            Preference::new(trip_id.clone(), "m2")
                .with_destination("lisbon")
                .with_budget(4),
        );

        let worker = PreferenceAggregator::new(repo);
        let mut state = WorkflowState::new(trip_id, "plan");
        state.members = vec!["m1".into(), "m2".into()];
        let update = worker.invoke(&state).await.unwrap();

        assert_eq!(update.activate, Some(Phase::DestinationDecision));
        let Patch::Set(summary) = &update.data.preferences_summary else {
            panic!("summary not set");
        };
        assert_eq!(summary.destination_tally[0].count, 2);
        // budget spread of 3 is a conflict
        assert_eq!(update.data.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_members_reported_as_warning() {
        let repo = Arc::new(MemoryRepo::default());
        let trip_id = TripId::new("t1");
        repo.insert_trip(Trip::new(
            trip_id.clone(),
            "Spring",
            vec!["m1".into(), "m2".into(), "m3".into()],
        ));
        repo.insert_preference(Preference::new(trip_id.clone(), "m1").with_destination("Oslo"));

        let worker = PreferenceAggregator::new(repo);
        let update = worker
            .invoke(&WorkflowState::new(trip_id, "plan"))
            .await
            .unwrap();

        assert!(update.has_warnings());
        assert!(update.data.warnings[0].contains("2 of 3"));
    }

    #[tokio::test]
    async fn test_unknown_trip_is_worker_error() {
        let worker = PreferenceAggregator::new(Arc::new(MemoryRepo::default()));
        let err = worker
            .invoke(&WorkflowState::new(TripId::new("ghost"), "plan"))
            .await
            .unwrap_err();
        assert_eq!(err, WorkerError::TripNotFound("ghost".to_string()));
    }
}
