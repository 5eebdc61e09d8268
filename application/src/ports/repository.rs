//! Persistence ports
//!
//! The engine treats storage as a document store keyed by trip id. It never
//! assumes transactions spanning multiple trips.

use async_trait::async_trait;
use thiserror::Error;
use tripsync_domain::{Preference, Trip, TripId, WorkflowState};

/// Errors from the persistence layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Trip not found: {0}")]
    TripNotFound(TripId),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Trip and preference storage
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn load_trip(&self, trip_id: &TripId) -> Result<Trip, RepositoryError>;

    async fn save_trip(&self, trip: &Trip) -> Result<(), RepositoryError>;

    async fn load_preferences(&self, trip_id: &TripId) -> Result<Vec<Preference>, RepositoryError>;

    /// Insert or replace the preference of `preference.member_id`
    async fn save_preference(&self, preference: &Preference) -> Result<(), RepositoryError>;
}

/// Storage for the workflow state of interrupted runs
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save_checkpoint(&self, state: &WorkflowState) -> Result<(), RepositoryError>;

    async fn load_checkpoint(
        &self,
        trip_id: &TripId,
    ) -> Result<Option<WorkflowState>, RepositoryError>;

    async fn delete_checkpoint(&self, trip_id: &TripId) -> Result<(), RepositoryError>;
}

/// Checkpoint store that keeps nothing
pub struct NoCheckpoints;

#[async_trait]
impl CheckpointStore for NoCheckpoints {
    async fn save_checkpoint(&self, _state: &WorkflowState) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn load_checkpoint(
        &self,
        _trip_id: &TripId,
    ) -> Result<Option<WorkflowState>, RepositoryError> {
        Ok(None)
    }

    async fn delete_checkpoint(&self, _trip_id: &TripId) -> Result<(), RepositoryError> {
        Ok(())
    }
}
