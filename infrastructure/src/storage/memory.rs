//! In-memory trip store
//!
//! Document-shaped storage keyed by trip id. Checkpoints are kept as
//! serialized JSON so a resumed run sees exactly what a durable store
//! would hand back.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use tripsync_application::{CheckpointStore, RepositoryError, TripRepository};
use tripsync_domain::{Preference, Trip, TripId, WorkflowState};

#[derive(Default)]
struct Tables {
    trips: HashMap<TripId, Trip>,
    preferences: HashMap<TripId, Vec<Preference>>,
    checkpoints: HashMap<TripId, String>,
}

#[derive(Default)]
pub struct InMemoryTripStore {
    tables: RwLock<Tables>,
}

impl InMemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a trip together with its members' preferences.
    pub fn seed(&self, trip: Trip, preferences: Vec<Preference>) {
        let mut tables = self.write();
        tables.preferences.insert(trip.id.clone(), preferences);
        tables.trips.insert(trip.id.clone(), trip);
    }
}

#[async_trait]
impl TripRepository for InMemoryTripStore {
    async fn load_trip(&self, trip_id: &TripId) -> Result<Trip, RepositoryError> {
        self.read()
            .trips
            .get(trip_id)
            .cloned()
            .ok_or_else(|| RepositoryError::TripNotFound(trip_id.clone()))
    }

    async fn save_trip(&self, trip: &Trip) -> Result<(), RepositoryError> {
        self.write().trips.insert(trip.id.clone(), trip.clone());
        Ok(())
    }

    async fn load_preferences(&self, trip_id: &TripId) -> Result<Vec<Preference>, RepositoryError> {
        Ok(self
            .read()
            .preferences
            .get(trip_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_preference(&self, preference: &Preference) -> Result<(), RepositoryError> {
        let mut tables = self.write();
        let prefs = tables
            .preferences
            .entry(preference.trip_id.clone())
            .or_default();
        prefs.retain(|p| p.member_id != preference.member_id);
        prefs.push(preference.clone());
        debug!(trip_id = %preference.trip_id, member = %preference.member_id, "Preference saved");
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for InMemoryTripStore {
    async fn save_checkpoint(&self, state: &WorkflowState) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(state)
            .map_err(|e| RepositoryError::Storage(format!("checkpoint encode: {e}")))?;
        self.write().checkpoints.insert(state.trip_id.clone(), json);
        Ok(())
    }

    async fn load_checkpoint(
        &self,
        trip_id: &TripId,
    ) -> Result<Option<WorkflowState>, RepositoryError> {
        let Some(json) = self.read().checkpoints.get(trip_id).cloned() else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| RepositoryError::Storage(format!("checkpoint decode: {e}")))
    }

    async fn delete_checkpoint(&self, trip_id: &TripId) -> Result<(), RepositoryError> {
        self.write().checkpoints.remove(trip_id);
        Ok(())
    }
}
