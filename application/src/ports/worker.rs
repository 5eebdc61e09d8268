//! Worker contract
//!
//! Every worker consumes the current [`WorkflowState`] and returns a partial
//! [`StateUpdate`]. Recoverable trouble (exhausted retries, empty results)
//! is reported through the update's warnings, not as an error.

use super::repository::RepositoryError;
use async_trait::async_trait;
use thiserror::Error;
use tripsync_domain::{StateUpdate, WorkflowState};

/// Unrecoverable worker failure. Halts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("Trip not found: {0}")]
    TripNotFound(String),

    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}

impl From<RepositoryError> for WorkerError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::TripNotFound(id) => WorkerError::TripNotFound(id.to_string()),
            RepositoryError::Storage(msg) => WorkerError::Storage(msg),
        }
    }
}

#[async_trait]
pub trait Worker: Send + Sync {
    /// Routing key this worker is registered under
    fn name(&self) -> &str;

    async fn invoke(&self, state: &WorkflowState) -> Result<StateUpdate, WorkerError>;
}
