//! Vote options

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One choice in a voting round.
///
/// The vote count is always the number of voters; there is no separate
/// counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOption {
    /// Canonical choice, e.g. a destination or a date-range token
    pub value: String,
    /// Display form
    pub label: String,
    #[serde(default)]
    pub voters: BTreeSet<String>,
}

impl VoteOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            voters: BTreeSet::new(),
        }
    }

    pub fn votes(&self) -> usize {
        self.voters.len()
    }

    pub fn add_voter(&mut self, member_id: &str) -> bool {
        self.voters.insert(member_id.to_string())
    }

    pub fn remove_voter(&mut self, member_id: &str) -> bool {
        self.voters.remove(member_id)
    }

    pub fn has_voter(&self, member_id: &str) -> bool {
        self.voters.contains(member_id)
    }
}

/// Options sharing the highest vote count, in option order.
///
/// Empty if nobody voted.
pub fn leading_options(options: &[VoteOption]) -> Vec<&VoteOption> {
    let max = options.iter().map(VoteOption::votes).max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    options.iter().filter(|o| o.votes() == max).collect()
}
