//! Infrastructure layer for tripsync
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod assist;
pub mod config;
pub mod generation;
pub mod logging;
pub mod notify;
pub mod storage;

// Re-export commonly used types
#[cfg(feature = "assist-http")]
pub use assist::HttpRoutingStrategy;
pub use config::{
    ConfigLoader, ConfigValidationError, FileAssistConfig, FileConfig, FileEngineConfig,
    FileLoggingConfig, FileOutputConfig, FileOutputFormat, FileResearchConfig, FileRetryConfig,
    FileSelectionConfig,
};
pub use generation::{HeuristicActivityGenerator, HeuristicItineraryGenerator};
pub use logging::JsonlEventLog;
pub use notify::{BroadcastNotifier, EventForwarder, TripNotification};
pub use storage::InMemoryTripStore;
