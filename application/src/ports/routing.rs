//! Assistive routing port
//!
//! Consulted by the supervisor only when no deterministic rule applies.

use async_trait::async_trait;
use thiserror::Error;
use tripsync_domain::WorkflowState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Routing request failed: {0}")]
    Request(String),

    #[error("Unparseable routing response: {0}")]
    Parse(String),
}

/// A worker the router may choose, with what it does
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChoice {
    pub key: String,
    pub description: String,
}

/// Raw proposal from the strategy; the key is validated by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingProposal {
    pub next_task: String,
    pub reason: String,
}

#[async_trait]
pub trait RoutingStrategy: Send + Sync {
    async fn propose(
        &self,
        state: &WorkflowState,
        choices: &[RouteChoice],
    ) -> Result<RoutingProposal, RoutingError>;
}

/// Always proposes ending the run
pub struct EndRouting;

#[async_trait]
impl RoutingStrategy for EndRouting {
    async fn propose(
        &self,
        _state: &WorkflowState,
        _choices: &[RouteChoice],
    ) -> Result<RoutingProposal, RoutingError> {
        Ok(RoutingProposal {
            next_task: "end".to_string(),
            reason: "no deterministic rule applied".to_string(),
        })
    }
}
