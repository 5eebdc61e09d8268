//! Trip entity

use super::dates::DateRange;
use crate::consensus::activity::{ActivityBallot, SelectedActivity};
use crate::consensus::phase::{Phase, PhaseStatus};
use crate::consensus::tracking::PhaseTracking;
use crate::workflow::payloads::Activity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(String);

impl TripId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TripId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TripId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a trip.
///
/// `CollectingPreferences -> Planning -> Consensus <-> Planning -> Complete`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    CollectingPreferences,
    Planning,
    Consensus,
    Complete,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::CollectingPreferences => "collecting_preferences",
            TripStatus::Planning => "planning",
            TripStatus::Consensus => "consensus",
            TripStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A group planning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub name: String,
    /// Ordered member ids
    pub members: Vec<String>,
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub selected_dates: Option<DateRange>,
    #[serde(default)]
    pub trip_duration_days: Option<u32>,
    #[serde(default)]
    pub phase_tracking: Option<PhaseTracking>,
    /// Researched activities members vote on
    #[serde(default)]
    pub activity_catalog: Vec<Activity>,
    /// Per-activity up/down voters, keyed by activity id
    #[serde(default)]
    pub activity_ballots: BTreeMap<String, ActivityBallot>,
    #[serde(default)]
    pub selected_activities: Vec<SelectedActivity>,
}

impl Trip {
    pub fn new(id: impl Into<TripId>, name: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members,
            status: TripStatus::default(),
            destination: None,
            selected_dates: None,
            trip_duration_days: None,
            phase_tracking: None,
            activity_catalog: Vec::new(),
            activity_ballots: BTreeMap::new(),
            selected_activities: Vec::new(),
        }
    }

    pub fn is_member(&self, member_id: &str) -> bool {
        self.members.iter().any(|m| m == member_id)
    }

    /// Phase tracking, initialized on first use
    pub fn tracking_mut(&mut self) -> &mut PhaseTracking {
        self.phase_tracking.get_or_insert_with(PhaseTracking::new)
    }

    /// Recompute `status` from phase tracking.
    ///
    /// A trip that has not started tracking keeps its current status.
    pub fn sync_status(&mut self) {
        let Some(tracking) = &self.phase_tracking else {
            return;
        };
        self.status = if tracking.is_completed(Phase::ItineraryApproval) {
            TripStatus::Complete
        } else if tracking
            .current()
            .is_some_and(|(_, data)| data.status != PhaseStatus::Completed)
        {
            TripStatus::Consensus
        } else {
            TripStatus::Planning
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn trip() -> Trip {
        Trip::new("t1", "Summer", vec!["a".to_string(), "b".to_string()])
    }

    #[test]
    fn test_new_trip_defaults() {
        let trip = trip();
        assert_eq!(trip.status, TripStatus::CollectingPreferences);
        assert!(trip.is_member("a"));
        assert!(!trip.is_member("z"));
        assert!(trip.phase_tracking.is_none());
    }

    #[test]
    fn test_sync_status_follows_tracking() {
        let mut trip = trip();
        trip.sync_status();
        assert_eq!(trip.status, TripStatus::CollectingPreferences);

        let now = Utc::now();
        trip.tracking_mut().activate(Phase::DestinationDecision, now).unwrap();
        trip.sync_status();
        assert_eq!(trip.status, TripStatus::Consensus);

        trip.tracking_mut().complete(Phase::DestinationDecision, now).unwrap();
        trip.sync_status();
        assert_eq!(trip.status, TripStatus::Planning);
    }

    #[test]
    fn test_trip_id_serializes_transparently() {
        let json = serde_json::to_string(&TripId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
