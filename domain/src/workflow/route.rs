//! Routing keys

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Key naming a registered worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteKey(Cow<'static, str>);

impl RouteKey {
    pub const PREFERENCE_PROCESSOR: RouteKey = RouteKey(Cow::Borrowed("preference_processor"));
    pub const DESTINATION_RESEARCHER: RouteKey =
        RouteKey(Cow::Borrowed("destination_researcher"));
    pub const ITINERARY_PLANNER: RouteKey = RouteKey(Cow::Borrowed("itinerary_planner"));
    pub const CONSENSUS_RESOLVER: RouteKey = RouteKey(Cow::Borrowed("consensus_resolver"));

    pub fn new(key: impl Into<String>) -> Self {
        Self(Cow::Owned(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Routing decision for one step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NextTask {
    Worker(RouteKey),
    End,
}

impl NextTask {
    pub const END: &'static str = "end";

    pub fn is_end(&self) -> bool {
        matches!(self, NextTask::End)
    }

    pub fn as_str(&self) -> &str {
        match self {
            NextTask::Worker(key) => key.as_str(),
            NextTask::End => Self::END,
        }
    }
}

impl From<String> for NextTask {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case(Self::END) {
            NextTask::End
        } else {
            NextTask::Worker(RouteKey::new(s.trim()))
        }
    }
}

impl From<NextTask> for String {
    fn from(task: NextTask) -> Self {
        task.as_str().to_string()
    }
}

impl From<RouteKey> for NextTask {
    fn from(key: RouteKey) -> Self {
        NextTask::Worker(key)
    }
}

impl fmt::Display for NextTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
