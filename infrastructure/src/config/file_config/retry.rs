//! Retry configuration from TOML (`[retry]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tripsync_application::{Backoff, RetryPolicy};

/// Raw retry configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    pub max_attempts: u32,
    /// "fixed" or "exponential"
    pub backoff: Backoff,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// 0 is rejected by validation; omit the key to keep the default
    pub attempt_timeout_secs: u64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Backoff::Fixed,
            initial_delay_ms: 1500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            attempt_timeout_secs: 60,
        }
    }
}

impl FileRetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            attempt_timeout: Some(Duration::from_secs(self.attempt_timeout_secs)),
        }
    }
}
