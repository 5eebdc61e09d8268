//! Typed payloads produced by workers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A candidate activity at the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Intrinsic appeal, 0.0 to 1.0
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub duration_hours: Option<f32>,
}

impl Activity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            description: String::new(),
            base_score: 0.5,
            duration_hours: None,
        }
    }

    pub fn with_base_score(mut self, score: f64) -> Self {
        self.base_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Researched activities for a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityCatalog {
    pub destination: String,
    pub activities: Vec<Activity>,
    pub generated_at: DateTime<Utc>,
}

impl ActivityCatalog {
    pub fn empty(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            activities: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    pub slot: TimeSlot,
    pub title: String,
    #[serde(default)]
    pub activity_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// 1-based
    pub day: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub items: Vec<ItineraryItem>,
}

/// Day-by-day plan for the trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub destination: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    pub days: Vec<DayPlan>,
}

impl Itinerary {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Activity ids scheduled anywhere in the plan
    pub fn scheduled_activity_ids(&self) -> impl Iterator<Item = &str> {
        self.days
            .iter()
            .flat_map(|d| d.items.iter())
            .filter_map(|i| i.activity_id.as_deref())
    }
}
