//! Notification adapters

mod broadcast;

pub use broadcast::{BroadcastNotifier, EventForwarder, TripNotification};
