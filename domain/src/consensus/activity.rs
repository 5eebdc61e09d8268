//! Activity ballots and scored selection

use crate::core::error::DomainError;
use crate::workflow::payloads::Activity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

const NET_VOTE_WEIGHT: f64 = 10.0;
const BASE_SCORE_WEIGHT: f64 = 50.0;
const DOWNVOTE_PENALTY: f64 = 30.0;
const DOWNVOTE_PENALTY_THRESHOLD: usize = 2;

/// A member's stance on one activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Up,
    Down,
    /// Withdraw any previous stance
    Clear,
}

impl FromStr for Stance {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "upvote" => Ok(Stance::Up),
            "down" | "downvote" => Ok(Stance::Down),
            "clear" | "none" => Ok(Stance::Clear),
            other => Err(DomainError::UnknownOption {
                phase: super::phase::Phase::ActivityVoting,
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stance::Up => "up",
            Stance::Down => "down",
            Stance::Clear => "clear",
        };
        write!(f, "{s}")
    }
}

/// Up and down voters for one activity.
///
/// A member is in at most one of the two sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityBallot {
    #[serde(default)]
    pub up: BTreeSet<String>,
    #[serde(default)]
    pub down: BTreeSet<String>,
}

impl ActivityBallot {
    pub fn cast(&mut self, member_id: &str, stance: Stance) {
        self.up.remove(member_id);
        self.down.remove(member_id);
        match stance {
            Stance::Up => {
                self.up.insert(member_id.to_string());
            }
            Stance::Down => {
                self.down.insert(member_id.to_string());
            }
            Stance::Clear => {}
        }
    }

    pub fn net_votes(&self) -> i64 {
        self.up.len() as i64 - self.down.len() as i64
    }
}

/// An activity chosen by the group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedActivity {
    pub activity_id: String,
    pub name: String,
    pub category: String,
    pub score: f64,
    pub net_votes: i64,
}

/// Limits on how many activities are selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCaps {
    pub per_category: usize,
    pub total: usize,
}

impl Default for SelectionCaps {
    fn default() -> Self {
        Self {
            per_category: 7,
            total: 35,
        }
    }
}

fn score(activity: &Activity, ballot: Option<&ActivityBallot>) -> (f64, i64) {
    let net = ballot.map(ActivityBallot::net_votes).unwrap_or(0);
    let downvotes = ballot.map(|b| b.down.len()).unwrap_or(0);
    let mut score = NET_VOTE_WEIGHT * net as f64 + BASE_SCORE_WEIGHT * activity.base_score;
    if downvotes >= DOWNVOTE_PENALTY_THRESHOLD {
        score -= DOWNVOTE_PENALTY;
    }
    (score, net)
}

/// Rank the catalog by group votes and pick the winners.
///
/// Only activities with a net vote of at least one are eligible. Ties in
/// score keep catalog order.
pub fn select_activities(
    catalog: &[Activity],
    ballots: &BTreeMap<String, ActivityBallot>,
    caps: SelectionCaps,
) -> Vec<SelectedActivity> {
    let mut ranked: Vec<(usize, &Activity, f64, i64)> = catalog
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let (score, net) = score(a, ballots.get(&a.id));
            (i, a, score, net)
        })
        .filter(|(_, _, _, net)| *net >= 1)
        .collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));

    let mut per_category: HashMap<&str, usize> = HashMap::new();
    let mut selected = Vec::new();
    for (_, activity, score, net) in ranked {
        if selected.len() >= caps.total {
            break;
        }
        let count = per_category.entry(activity.category.as_str()).or_insert(0);
        if *count >= caps.per_category {
            continue;
        }
        *count += 1;
        selected.push(SelectedActivity {
            activity_id: activity.id.clone(),
            name: activity.name.clone(),
            category: activity.category.clone(),
            score,
            net_votes: net,
        });
    }
    selected
}
