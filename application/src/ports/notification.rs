//! Notification sink port
//!
//! Delivery is best effort. A failed publish is logged and dropped; it never
//! fails the state transition that produced the event.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use tripsync_domain::{TripEvent, TripId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("No listeners for trip {0}")]
    NoListeners(TripId),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Pub/sub channel for trip events
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, trip_id: &TripId, event: TripEvent) -> Result<(), NotifyError>;
}

/// Publish and swallow any failure.
pub async fn publish_best_effort(sink: &dyn NotificationSink, trip_id: &TripId, event: TripEvent) {
    let kind = event.kind();
    if let Err(e) = sink.publish(trip_id, event).await {
        warn!(trip_id = %trip_id, event = kind, "Failed to publish event: {}", e);
    }
}

/// Sink that drops every event
pub struct NoNotifications;

#[async_trait]
impl NotificationSink for NoNotifications {
    async fn publish(&self, _trip_id: &TripId, _event: TripEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Fans each event out to several sinks.
///
/// Delegates are published to concurrently and every one receives the
/// event even when another fails; the first failure in delegate order is
/// returned.
pub struct CompositeNotifier {
    delegates: Vec<Arc<dyn NotificationSink>>,
}

impl CompositeNotifier {
    pub fn new(delegates: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { delegates }
    }
}

#[async_trait]
impl NotificationSink for CompositeNotifier {
    async fn publish(&self, trip_id: &TripId, event: TripEvent) -> Result<(), NotifyError> {
        let deliveries = self
            .delegates
            .iter()
            .map(|delegate| delegate.publish(trip_id, event.clone()));
        join_all(deliveries)
            .await
            .into_iter()
            .find_map(Result::err)
            .map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        events: Mutex<Vec<TripEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSink for Recording {
        async fn publish(&self, trip_id: &TripId, event: TripEvent) -> Result<(), NotifyError> {
            self.events.lock().unwrap().push(event);
            if self.fail {
                Err(NotifyError::NoListeners(trip_id.clone()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_composite_delivers_to_all_despite_failure() {
        let failing = Arc::new(Recording {
            events: Mutex::new(Vec::new()),
            fail: true,
        });
        let healthy = Arc::new(Recording {
            events: Mutex::new(Vec::new()),
            fail: false,
        });
        let composite = CompositeNotifier::new(vec![failing.clone(), healthy.clone()]);

        let result = composite
            .publish(&TripId::new("t1"), TripEvent::info("hello"))
            .await;

        assert!(matches!(result, Err(NotifyError::NoListeners(_))));
        assert_eq!(failing.events.lock().unwrap().len(), 1);
        assert_eq!(healthy.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_best_effort_swallows_errors() {
        let failing = Recording {
            events: Mutex::new(Vec::new()),
            fail: true,
        };
        publish_best_effort(&failing, &TripId::new("t1"), TripEvent::info("x")).await;
        assert_eq!(failing.events.lock().unwrap().len(), 1);
    }
}
