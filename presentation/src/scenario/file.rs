//! Scenario file format
//!
//! ```json
//! {
//!   "trip": { "id": "weekend", "name": "Weekend away", "members": ["ana", "ben"] },
//!   "preferences": [
//!     { "member": "ana", "destination": "Lisbon", "vibes": ["food"],
//!       "available_dates": ["2025-06-01:2025-06-05"] }
//!   ],
//!   "actions": [
//!     { "action": "vote", "member": "ana", "phase": "destination_decision", "choices": ["lisbon"] },
//!     { "action": "activity_vote", "member": "ana", "activity": "lisbon-food-1", "stance": "up" },
//!     { "action": "ready", "member": "ana", "phase": "activity_voting" }
//!   ]
//! }
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tripsync_domain::{DateRange, Phase, Preference, Stance, Trip, TripId};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Cannot read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioTrip {
    pub id: String,
    pub name: String,
    pub members: Vec<String>,
}

/// A member's submitted preferences
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioMember {
    pub member: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub budget_level: Option<u8>,
    #[serde(default)]
    pub vibes: Vec<String>,
    #[serde(default)]
    pub deal_breaker: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub available_dates: Vec<DateRange>,
}

impl ScenarioMember {
    fn to_preference(&self, trip_id: &TripId) -> Preference {
        let mut preference = Preference::new(trip_id.clone(), self.member.clone())
            .with_vibes(self.vibes.iter().cloned())
            .with_availability(self.available_dates.clone());
        if let Some(destination) = &self.destination {
            preference = preference.with_destination(destination.clone());
        }
        if let Some(level) = self.budget_level {
            preference = preference.with_budget(level);
        }
        preference.deal_breaker = self.deal_breaker.clone();
        preference.notes = self.notes.clone();
        preference
    }
}

/// One scripted member action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    Vote {
        member: String,
        phase: Phase,
        choices: Vec<String>,
    },
    Ready {
        member: String,
        phase: Phase,
    },
    Unready {
        member: String,
        phase: Phase,
    },
    /// `activity` is an activity id or, failing that, its name
    ActivityVote {
        member: String,
        activity: String,
        stance: Stance,
    },
    ResubmitAvailability {
        member: String,
        available_dates: Vec<DateRange>,
    },
}

impl ScenarioAction {
    pub fn member(&self) -> &str {
        match self {
            ScenarioAction::Vote { member, .. }
            | ScenarioAction::Ready { member, .. }
            | ScenarioAction::Unready { member, .. }
            | ScenarioAction::ActivityVote { member, .. }
            | ScenarioAction::ResubmitAvailability { member, .. } => member,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioAction::Vote { .. } => "vote",
            ScenarioAction::Ready { .. } => "ready",
            ScenarioAction::Unready { .. } => "unready",
            ScenarioAction::ActivityVote { .. } => "activity_vote",
            ScenarioAction::ResubmitAvailability { .. } => "resubmit_availability",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    pub trip: ScenarioTrip,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub preferences: Vec<ScenarioMember>,
    #[serde(default)]
    pub actions: Vec<ScenarioAction>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(raw)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Structural checks only. Actions by non-members are left for the
    /// engine to reject.
    fn validate(&self) -> Result<(), ScenarioError> {
        if self.trip.id.trim().is_empty() {
            return Err(ScenarioError::Invalid("trip id is empty".into()));
        }
        if self.trip.members.is_empty() {
            return Err(ScenarioError::Invalid("trip has no members".into()));
        }
        let mut seen = HashSet::new();
        for member in &self.trip.members {
            if !seen.insert(member.as_str()) {
                return Err(ScenarioError::Invalid(format!("duplicate member '{}'", member)));
            }
        }
        if let Some(stranger) = self
            .preferences
            .iter()
            .find(|p| !self.trip.members.contains(&p.member))
        {
            return Err(ScenarioError::Invalid(format!(
                "preferences for unknown member '{}'",
                stranger.member
            )));
        }
        Ok(())
    }

    pub fn trip_id(&self) -> TripId {
        TripId::new(self.trip.id.clone())
    }

    pub fn seed_trip(&self) -> Trip {
        Trip::new(self.trip_id(), self.trip.name.clone(), self.trip.members.clone())
    }

    pub fn seed_preferences(&self) -> Vec<Preference> {
        let trip_id = self.trip_id();
        self.preferences
            .iter()
            .map(|p| p.to_preference(&trip_id))
            .collect()
    }
}
