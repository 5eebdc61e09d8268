//! Generation ports
//!
//! External content generation (activity research, itinerary writing).
//! Calls may be slow or flaky; workers wrap them in a retry policy.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tripsync_domain::{Activity, ActivityCatalog, Itinerary, PreferencesSummary, TripId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Rate limited")]
    RateLimited,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generation failed: {0}")]
    Failed(String),
}

impl GenerationError {
    /// Whether a retry might succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout(_) | GenerationError::RateLimited | GenerationError::Unavailable(_)
        )
    }
}

/// Input for activity research
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchRequest {
    pub trip_id: TripId,
    pub destination: String,
    pub max_items: usize,
    pub preferred_categories: Vec<String>,
    pub preferences: Option<PreferencesSummary>,
}

/// Input for itinerary generation
#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryRequest {
    pub trip_id: TripId,
    pub destination: String,
    pub duration_days: u32,
    pub start_date: Option<NaiveDate>,
    pub activities: Vec<Activity>,
}

#[async_trait]
pub trait ActivityGenerator: Send + Sync {
    async fn research(&self, request: &ResearchRequest) -> Result<ActivityCatalog, GenerationError>;
}

#[async_trait]
pub trait ItineraryGenerator: Send + Sync {
    async fn plan(&self, request: &ItineraryRequest) -> Result<Itinerary, GenerationError>;
}
