//! Destination research worker
//!
//! Asks the [`ActivityGenerator`] for candidate activities at the agreed
//! destination, then requests activity voting. Results are cached per
//! logical input, so re-running research for an unchanged trip does not
//! call the generator again.

use crate::config::ResearchParams;
use crate::ports::generation::{ActivityGenerator, ResearchRequest};
use crate::ports::sleeper::Sleeper;
use crate::ports::worker::{Worker, WorkerError};
use crate::retry::{RetryOutcome, RetryPolicy, with_retry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use tripsync_domain::{
    ActivityCatalog, AgentDataPatch, Patch, Phase, RouteKey, StateUpdate, TripId, WorkflowState,
};

pub struct DestinationResearcher {
    generator: Arc<dyn ActivityGenerator>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
    params: ResearchParams,
    cache: Mutex<HashMap<String, ActivityCatalog>>,
}

impl DestinationResearcher {
    pub fn new(
        generator: Arc<dyn ActivityGenerator>,
        sleeper: Arc<dyn Sleeper>,
        retry: RetryPolicy,
        params: ResearchParams,
    ) -> Self {
        Self {
            generator,
            sleeper,
            retry,
            params,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(&self, trip_id: &TripId, destination: &str) -> String {
        let mut categories: Vec<String> = self
            .params
            .preferred_categories
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect();
        categories.sort();
        format!(
            "{}|{}|{}|{}",
            trip_id,
            destination.trim().to_lowercase(),
            self.params.max_items,
            categories.join(",")
        )
    }

    fn cached(&self, key: &str) -> Option<ActivityCatalog> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn remember(&self, key: String, catalog: &ActivityCatalog) {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, catalog.clone());
    }

    fn update(&self, catalog: ActivityCatalog, message: String, warnings: Vec<String>) -> StateUpdate {
        let mut update = StateUpdate::new()
            .with_message(self.name(), message)
            .with_activation(Phase::ActivityVoting);
        update.data = AgentDataPatch {
            activity_catalog: Patch::Set(catalog),
            warnings,
            ..AgentDataPatch::default()
        };
        update
    }
}

#[async_trait]
impl Worker for DestinationResearcher {
    fn name(&self) -> &str {
        RouteKey::DESTINATION_RESEARCHER.as_str()
    }

    async fn invoke(&self, state: &WorkflowState) -> Result<StateUpdate, WorkerError> {
        let destination = state
            .data
            .destination
            .as_deref()
            .ok_or(WorkerError::MissingInput("destination"))?;

        let key = self.cache_key(&state.trip_id, destination);
        if let Some(catalog) = self.cached(&key) {
            debug!(trip_id = %state.trip_id, destination, "Research cache hit");
            let message = format!(
                "Reused {} researched activities for {}",
                catalog.activities.len(),
                destination
            );
            return Ok(self.update(catalog, message, Vec::new()));
        }

        let request = ResearchRequest {
            trip_id: state.trip_id.clone(),
            destination: destination.to_string(),
            max_items: self.params.max_items,
            preferred_categories: self.params.preferred_categories.clone(),
            preferences: state.data.preferences_summary.clone(),
        };
        let outcome = with_retry(&self.retry, self.sleeper.as_ref(), |_attempt| {
            self.generator.research(&request)
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded {
                value: mut catalog,
                attempts,
            } => {
                catalog.activities.truncate(self.params.max_items);
                self.remember(key, &catalog);
                info!(
                    trip_id = %state.trip_id,
                    destination,
                    activities = catalog.activities.len(),
                    attempts,
                    "Activities researched"
                );
                let mut warnings = Vec::new();
                if catalog.is_empty() {
                    warnings.push(format!("No activities found for {destination}"));
                }
                let message = format!(
                    "Researched {} activities for {}",
                    catalog.activities.len(),
                    destination
                );
                Ok(self.update(catalog, message, warnings))
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => {
                warn!(trip_id = %state.trip_id, destination, attempts, "Activity research failed: {}", last_error);
                let warning = format!(
                    "Activity research for {destination} failed after {attempts} attempt(s): {last_error}"
                );
                let message = format!("Research for {destination} returned no activities");
                Ok(self.update(ActivityCatalog::empty(destination), message, vec![warning]))
            }
        }
    }
}
