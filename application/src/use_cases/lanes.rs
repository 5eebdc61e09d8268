//! Per-trip serialization lanes
//!
//! Every read-modify-write of a trip record happens while holding that
//! trip's lane, so concurrent votes, readiness changes and supervisor steps
//! for one trip never interleave. Different trips never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tripsync_domain::TripId;

/// Exclusive access to one trip, released on drop
pub type LaneGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct TripLanes {
    lanes: Mutex<HashMap<TripId, Arc<AsyncMutex<()>>>>,
}

impl TripLanes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `trip_id`
    pub async fn acquire(&self, trip_id: &TripId) -> LaneGuard {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(lanes.entry(trip_id.clone()).or_default())
        };
        lane.lock_owned().await
    }

    /// Drop the lane of a trip nobody is using
    pub fn forget(&self, trip_id: &TripId) {
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        if lanes
            .get(trip_id)
            .is_some_and(|lane| Arc::strong_count(lane) == 1)
        {
            lanes.remove(trip_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_tracked(&self, trip_id: &TripId) -> bool {
        self.lanes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(trip_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_trip_is_serialized() {
        let lanes = Arc::new(TripLanes::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lanes = Arc::clone(&lanes);
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = lanes.acquire(&TripId::new("t1")).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_trips_do_not_block() {
        let lanes = TripLanes::new();
        let _a = lanes.acquire(&TripId::new("a")).await;
        let acquired =
            tokio::time::timeout(Duration::from_millis(100), lanes.acquire(&TripId::new("b"))).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_forget_keeps_busy_lane() {
        let lanes = TripLanes::new();
        let guard = lanes.acquire(&TripId::new("a")).await;
        lanes.forget(&TripId::new("a"));
        assert!(lanes.is_tracked(&TripId::new("a")));
        drop(guard);
        lanes.forget(&TripId::new("a"));
        assert!(!lanes.is_tracked(&TripId::new("a")));
    }
}
