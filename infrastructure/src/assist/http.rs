//! Routing strategy backed by a remote JSON endpoint
//!
//! POSTs a snapshot of the workflow state together with the worker
//! registry and expects `{"next_task": "...", "reason": "..."}` back.
//! The returned key is not trusted here; the supervisor validates it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use tripsync_application::{RouteChoice, RoutingError, RoutingProposal, RoutingStrategy};
use tripsync_domain::WorkflowState;

#[derive(Serialize)]
struct RouteRequest<'a> {
    state: &'a WorkflowState,
    workers: Vec<WorkerEntry<'a>>,
}

#[derive(Serialize)]
struct WorkerEntry<'a> {
    key: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct RouteResponse {
    next_task: String,
    #[serde(default)]
    reason: String,
}

pub struct HttpRoutingStrategy {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRoutingStrategy {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tripsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RoutingError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RoutingStrategy for HttpRoutingStrategy {
    async fn propose(
        &self,
        state: &WorkflowState,
        choices: &[RouteChoice],
    ) -> Result<RoutingProposal, RoutingError> {
        let body = RouteRequest {
            state,
            workers: choices
                .iter()
                .map(|c| WorkerEntry {
                    key: &c.key,
                    description: &c.description,
                })
                .collect(),
        };

        debug!(endpoint = %self.endpoint, trip_id = %state.trip_id, "Requesting assistive route");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RoutingError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Request(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let parsed: RouteResponse = response
            .json()
            .await
            .map_err(|e| RoutingError::Parse(e.to_string()))?;

        Ok(RoutingProposal {
            next_task: parsed.next_task.trim().to_string(),
            reason: parsed.reason,
        })
    }
}
