//! In-process pub/sub hub for trip events
//!
//! Subscribers receive every event for every trip and filter by trip id.
//! A lagging subscriber loses the oldest events instead of slowing the
//! engine down.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::warn;
use tripsync_application::{NotificationSink, NotifyError, publish_best_effort};
use tripsync_domain::{TripEvent, TripId};

/// One published event
#[derive(Debug, Clone, PartialEq)]
pub struct TripNotification {
    pub trip_id: TripId,
    pub event: TripEvent,
}

pub struct BroadcastNotifier {
    sender: broadcast::Sender<TripNotification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TripNotification> {
        self.sender.subscribe()
    }

    /// Deliver every event published from now on to `sink`, off the
    /// publishing task.
    pub fn forward_to(&self, sink: Arc<dyn NotificationSink>) -> EventForwarder {
        let mut rx = self.subscribe();
        let (shutdown, mut stop) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(n) => publish_best_effort(sink.as_ref(), &n.trip_id, n.event).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Event forwarder fell behind, events dropped");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = &mut stop => {
                        loop {
                            match rx.try_recv() {
                                Ok(n) => publish_best_effort(sink.as_ref(), &n.trip_id, n.event).await,
                                Err(TryRecvError::Lagged(skipped)) => {
                                    warn!(skipped, "Event forwarder fell behind, events dropped");
                                }
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
        });
        EventForwarder { shutdown, handle }
    }
}

/// Background delivery started by [`BroadcastNotifier::forward_to`]
pub struct EventForwarder {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl EventForwarder {
    /// Deliver what has already been published, then stop.
    pub async fn finish(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            warn!("Event forwarder ended abnormally: {}", e);
        }
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl NotificationSink for BroadcastNotifier {
    async fn publish(&self, trip_id: &TripId, event: TripEvent) -> Result<(), NotifyError> {
        self.sender
            .send(TripNotification {
                trip_id: trip_id.clone(),
                event,
            })
            .map(|_| ())
            .map_err(|_| NotifyError::NoListeners(trip_id.clone()))
    }
}
