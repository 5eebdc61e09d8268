//! Member preferences and their aggregation into a trip-level summary.

use super::dates::DateRange;
use super::entities::TripId;
use crate::core::string::normalize_choice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of vibes considered per member
const MAX_VIBES: usize = 6;

/// Budget levels further apart than this are reported as a conflict
const MAX_BUDGET_SPREAD: u8 = 2;

/// Share of members that must have responded before planning is ready
const READY_COVERAGE: f64 = 0.8;

/// One member's submitted preferences for a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub trip_id: TripId,
    pub member_id: String,
    #[serde(default)]
    pub destination: Option<String>,
    /// 1 = budget, 2 = moderate, 3 = comfort, 4 = luxury
    #[serde(default)]
    pub budget_level: Option<u8>,
    /// Ordered most-important first
    #[serde(default)]
    pub vibes: Vec<String>,
    #[serde(default)]
    pub deal_breaker: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub available_dates: Vec<DateRange>,
}

impl Preference {
    pub fn new(trip_id: TripId, member_id: impl Into<String>) -> Self {
        Self {
            trip_id,
            member_id: member_id.into(),
            destination: None,
            budget_level: None,
            vibes: Vec::new(),
            deal_breaker: None,
            notes: None,
            available_dates: Vec::new(),
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_budget(mut self, level: u8) -> Self {
        self.budget_level = Some(level.clamp(1, 4));
        self
    }

    pub fn with_vibes<I, S>(mut self, vibes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vibes = vibes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_availability(mut self, windows: Vec<DateRange>) -> Self {
        self.available_dates = windows;
        self
    }

    /// Normalized destination, if the member named a non-blank one
    pub fn normalized_destination(&self) -> Option<String> {
        self.destination
            .as_deref()
            .map(normalize_choice)
            .filter(|d| !d.is_empty())
    }
}

/// How many members asked for one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationCount {
    /// Normalized value (trimmed, lower-cased)
    pub value: String,
    /// First spelling a member submitted
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibeWeight {
    pub vibe: String,
    pub weight: f64,
}

/// Trip-level view of all member preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferencesSummary {
    pub member_count: usize,
    pub respondents: usize,
    /// Ordered by first appearance
    pub destination_tally: Vec<DestinationCount>,
    /// Highest weight first
    pub aggregated_vibes: Vec<VibeWeight>,
    /// Distinct levels, ascending
    pub budget_levels: Vec<u8>,
    pub conflicts: Vec<String>,
    pub coverage: f64,
    pub ready_for_planning: bool,
    pub suggested_destination: Option<String>,
}

impl PreferencesSummary {
    /// Aggregate the preferences of `members`.
    ///
    /// Preferences from ids outside `members` are ignored. A member with
    /// several submissions counts once, with their latest submission.
    pub fn aggregate(members: &[String], preferences: &[Preference]) -> Self {
        let mut latest: BTreeMap<&str, &Preference> = BTreeMap::new();
        for pref in preferences {
            if members.iter().any(|m| m == &pref.member_id) {
                latest.insert(pref.member_id.as_str(), pref);
            }
        }

        // Keep member order so the tally's "first appearance" is stable.
        let responding: Vec<&Preference> = members
            .iter()
            .filter_map(|m| latest.get(m.as_str()).copied())
            .collect();

        let mut destination_tally: Vec<DestinationCount> = Vec::new();
        for pref in &responding {
            let Some(value) = pref.normalized_destination() else {
                continue;
            };
            match destination_tally.iter_mut().find(|d| d.value == value) {
                Some(entry) => entry.count += 1,
                None => destination_tally.push(DestinationCount {
                    value,
                    label: pref.destination.as_deref().unwrap_or_default().trim().to_string(),
                    count: 1,
                }),
            }
        }

        let mut vibe_sum: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for pref in &responding {
            for (i, vibe) in pref.vibes.iter().take(MAX_VIBES).enumerate() {
                let weight = (0.9 - i as f64 * 0.1).max(0.5);
                let entry = vibe_sum.entry(vibe.trim().to_lowercase()).or_insert((0.0, 0));
                entry.0 += weight;
                entry.1 += 1;
            }
        }
        let mut aggregated_vibes: Vec<VibeWeight> = vibe_sum
            .into_iter()
            .filter(|(vibe, _)| !vibe.is_empty())
            .map(|(vibe, (sum, n))| VibeWeight {
                vibe,
                weight: sum / n.max(1) as f64,
            })
            .collect();
        aggregated_vibes.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.vibe.cmp(&b.vibe)));

        let mut budget_levels: Vec<u8> = responding.iter().filter_map(|p| p.budget_level).collect();
        budget_levels.sort_unstable();
        budget_levels.dedup();

        let mut conflicts = Vec::new();
        if let (Some(low), Some(high)) = (budget_levels.first(), budget_levels.last())
            && high - low > MAX_BUDGET_SPREAD
        {
            conflicts.push("budget_level: large spread in budget levels".to_string());
        }

        let coverage = if members.is_empty() {
            0.0
        } else {
            responding.len() as f64 / members.len() as f64
        };

        let suggested_destination = match destination_tally.first() {
            Some(top) => Some(
                destination_tally
                    .iter()
                    .fold(top, |best, d| if d.count > best.count { d } else { best })
                    .label
                    .clone(),
            ),
            None => Some(
                destination_for_vibe(aggregated_vibes.first().map(|v| v.vibe.as_str()))
                    .to_string(),
            ),
        };

        Self {
            member_count: members.len(),
            respondents: responding.len(),
            destination_tally,
            aggregated_vibes,
            budget_levels,
            ready_for_planning: coverage >= READY_COVERAGE && conflicts.is_empty(),
            conflicts,
            coverage,
            suggested_destination,
        }
    }

    /// Destinations sharing the highest request count.
    ///
    /// Empty when no member named a destination.
    pub fn top_destinations(&self) -> Vec<&DestinationCount> {
        let max = self.destination_tally.iter().map(|d| d.count).max().unwrap_or(0);
        self.destination_tally
            .iter()
            .filter(|d| max > 0 && d.count == max)
            .collect()
    }
}

/// Default destination for a dominant vibe.
pub fn destination_for_vibe(vibe: Option<&str>) -> &'static str {
    match vibe.map(str::to_lowercase).as_deref() {
        Some("adventure") => "Queenstown, New Zealand",
        Some("nature") => "Banff, Canada",
        Some("food") => "Tokyo, Japan",
        Some("culture") => "Rome, Italy",
        Some("relax") => "Bali, Indonesia",
        Some("nightlife") => "Las Vegas, USA",
        _ => "San Francisco, USA",
    }
}
