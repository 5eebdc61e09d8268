//! In-memory fakes shared by use case tests

use crate::ports::notification::{NotificationSink, NotifyError};
use crate::ports::repository::{CheckpointStore, RepositoryError, TripRepository};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tripsync_domain::{Preference, Trip, TripEvent, TripId, WorkflowState};

#[derive(Default)]
pub struct MemoryRepo {
    trips: Mutex<HashMap<TripId, Trip>>,
    preferences: Mutex<Vec<Preference>>,
    checkpoints: Mutex<HashMap<TripId, WorkflowState>>,
}

impl MemoryRepo {
    pub fn insert_trip(&self, trip: Trip) {
        self.trips.lock().unwrap().insert(trip.id.clone(), trip);
    }

    pub fn insert_preference(&self, preference: Preference) {
        self.preferences.lock().unwrap().push(preference);
    }

    pub fn trip(&self, trip_id: &TripId) -> Trip {
        self.trips.lock().unwrap()[trip_id].clone()
    }

    pub fn update_trip(&self, trip_id: &TripId, f: impl FnOnce(&mut Trip)) {
        let mut trips = self.trips.lock().unwrap();
        f(trips.get_mut(trip_id).unwrap());
    }

    pub fn checkpoint(&self, trip_id: &TripId) -> Option<WorkflowState> {
        self.checkpoints.lock().unwrap().get(trip_id).cloned()
    }
}

#[async_trait]
impl TripRepository for MemoryRepo {
    async fn load_trip(&self, trip_id: &TripId) -> Result<Trip, RepositoryError> {
        self.trips
            .lock()
            .unwrap()
            .get(trip_id)
            .cloned()
            .ok_or_else(|| RepositoryError::TripNotFound(trip_id.clone()))
    }

    async fn save_trip(&self, trip: &Trip) -> Result<(), RepositoryError> {
        self.insert_trip(trip.clone());
        Ok(())
    }

    async fn load_preferences(&self, trip_id: &TripId) -> Result<Vec<Preference>, RepositoryError> {
        Ok(self
            .preferences
            .lock()
            .unwrap()
            .iter()
            .filter(|p| &p.trip_id == trip_id)
            .cloned()
            .collect())
    }

    async fn save_preference(&self, preference: &Preference) -> Result<(), RepositoryError> {
        let mut prefs = self.preferences.lock().unwrap();
        prefs.retain(|p| !(p.trip_id == preference.trip_id && p.member_id == preference.member_id));
        prefs.push(preference.clone());
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for MemoryRepo {
    async fn save_checkpoint(&self, state: &WorkflowState) -> Result<(), RepositoryError> {
        self.checkpoints
            .lock()
            .unwrap()
            .insert(state.trip_id.clone(), state.clone());
        Ok(())
    }

    async fn load_checkpoint(
        &self,
        trip_id: &TripId,
    ) -> Result<Option<WorkflowState>, RepositoryError> {
        Ok(self.checkpoint(trip_id))
    }

    async fn delete_checkpoint(&self, trip_id: &TripId) -> Result<(), RepositoryError> {
        self.checkpoints.lock().unwrap().remove(trip_id);
        Ok(())
    }
}

/// Records events; a failing notifier still records before erroring
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<TripEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<TripEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn publish(&self, _trip_id: &TripId, event: TripEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event);
        if self.fail {
            Err(NotifyError::Delivery("socket closed".to_string()))
        } else {
            Ok(())
        }
    }
}
