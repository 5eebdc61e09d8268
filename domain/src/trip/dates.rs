//! Availability windows and their intersection across members.

use crate::core::error::DomainError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An inclusive range of calendar days.
///
/// The textual token is `YYYY-MM-DD:YYYY-MM-DD`. The end may be abbreviated
/// to `MM-DD`, in which case it takes the start's year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::InvalidDateRange(format!(
                "{} ends before it starts",
                Self { start, end }.token()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }

    /// Canonical token, used as the vote option value
    pub fn token(&self) -> String {
        format!(
            "{}:{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }

    /// Display form, e.g. "2024-06-01 to 2024-06-05"
    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }

    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateRange { start, end })
    }
}

impl FromStr for DateRange {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidDateRange(s.to_string());
        let (start, end) = s.trim().split_once(':').ok_or_else(invalid)?;
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
        let end = end.trim();
        let end = match NaiveDate::parse_from_str(end, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => NaiveDate::parse_from_str(&format!("{}-{}", start.year(), end), "%Y-%m-%d")
                .map_err(|_| invalid())?,
        };
        Self::new(start, end)
    }
}

impl TryFrom<String> for DateRange {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateRange> for String {
    fn from(range: DateRange) -> Self {
        range.token()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Ranges contained in every member's availability.
///
/// Each inner slice is one member's windows. Members with no windows impose
/// no constraint. Returns an empty list when nobody submitted availability,
/// and also when the members' windows are disjoint; callers distinguish the
/// two with [`has_any_availability`].
pub fn common_windows(per_member: &[Vec<DateRange>]) -> Vec<DateRange> {
    let mut constrained = per_member.iter().filter(|windows| !windows.is_empty());
    let Some(first) = constrained.next() else {
        return Vec::new();
    };

    let mut common = merge_windows(first);
    for windows in constrained {
        let windows = merge_windows(windows);
        common = common
            .iter()
            .flat_map(|a| windows.iter().filter_map(move |b| a.intersect(b)))
            .collect();
        if common.is_empty() {
            break;
        }
    }
    merge_windows(&common)
}

/// True when at least one member submitted a window
pub fn has_any_availability(per_member: &[Vec<DateRange>]) -> bool {
    per_member.iter().any(|windows| !windows.is_empty())
}

// Sort and coalesce overlapping or adjacent windows into maximal ranges.
fn merge_windows(windows: &[DateRange]) -> Vec<DateRange> {
    let mut sorted = windows.to_vec();
    sorted.sort();
    let mut merged: Vec<DateRange> = Vec::with_capacity(sorted.len());
    for window in sorted {
        match merged.last_mut() {
            Some(last) if window.start <= last.end + chrono::Days::new(1) => {
                last.end = last.end.max(window.end);
            }
            _ => merged.push(window),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(token: &str) -> DateRange {
        token.parse().unwrap()
    }

    #[test]
    fn test_parse_full_token() {
        let r = range("2024-06-01:2024-06-05");
        assert_eq!(r.days(), 5);
        assert_eq!(r.token(), "2024-06-01:2024-06-05");
        assert_eq!(r.label(), "2024-06-01 to 2024-06-05");
    }

    #[test]
    fn test_parse_abbreviated_end() {
        assert_eq!(range("2024-06-10:06-15"), range("2024-06-10:2024-06-15"));
    }

    #[test]
    fn test_parse_rejects_garbage_and_reversed() {
        assert!("2024-06-01".parse::<DateRange>().is_err());
        assert!("june:july".parse::<DateRange>().is_err());
        assert!("2024-06-05:2024-06-01".parse::<DateRange>().is_err());
    }

    #[test]
    fn test_serde_uses_token() {
        let r = range("2024-06-01:2024-06-03");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"2024-06-01:2024-06-03\"");
        let back: DateRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert!(serde_json::from_str::<DateRange>("\"nope\"").is_err());
    }

    #[test]
    fn test_disjoint_windows_have_no_overlap() {
        let members = vec![
            vec![range("2024-06-01:06-05")],
            vec![range("2024-06-10:06-15")],
        ];
        assert!(common_windows(&members).is_empty());
        assert!(has_any_availability(&members));
    }

    #[test]
    fn test_single_overlap() {
        let members = vec![
            vec![range("2024-06-01:06-10")],
            vec![range("2024-06-05:06-15")],
            vec![],
        ];
        assert_eq!(common_windows(&members), vec![range("2024-06-05:06-10")]);
    }

    #[test]
    fn test_multiple_overlaps() {
        let members = vec![
            vec![range("2024-06-01:06-05"), range("2024-07-01:07-10")],
            vec![range("2024-06-03:06-20"), range("2024-07-05:07-20")],
        ];
        assert_eq!(
            common_windows(&members),
            vec![range("2024-06-03:06-05"), range("2024-07-05:07-10")]
        );
    }

    #[test]
    fn test_adjacent_windows_merge() {
        let members = vec![vec![range("2024-06-01:06-03"), range("2024-06-04:06-06")]];
        assert_eq!(common_windows(&members), vec![range("2024-06-01:06-06")]);
    }

    #[test]
    fn test_no_availability_at_all() {
        let members: Vec<Vec<DateRange>> = vec![vec![], vec![]];
        assert!(common_windows(&members).is_empty());
        assert!(!has_any_availability(&members));
    }
}
