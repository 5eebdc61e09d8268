//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod assist;
mod engine;
mod output;
mod research;
mod retry;

pub use assist::FileAssistConfig;
pub use engine::FileEngineConfig;
pub use output::{FileLoggingConfig, FileOutputConfig, FileOutputFormat};
pub use research::{FileResearchConfig, FileSelectionConfig};
pub use retry::FileRetryConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tripsync_application::EngineConfig;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("engine.max_steps cannot be 0")]
    ZeroMaxSteps,

    #[error("engine.default_trip_days cannot be 0")]
    ZeroTripDays,

    #[error("retry.max_attempts cannot be 0")]
    ZeroAttempts,

    #[error("retry.attempt_timeout_secs cannot be 0")]
    ZeroTimeout,

    #[error("retry.multiplier must be at least 1.0")]
    InvalidMultiplier,

    #[error("{0} cannot be 0")]
    ZeroCap(&'static str),

    #[error("assist.endpoint cannot be empty")]
    EmptyEndpoint,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Step cap and trip length fallback
    pub engine: FileEngineConfig,
    /// Retry policy for generation calls
    pub retry: FileRetryConfig,
    /// Activity research hints
    pub research: FileResearchConfig,
    /// Activity selection caps
    pub activity_selection: FileSelectionConfig,
    pub output: FileOutputConfig,
    pub logging: FileLoggingConfig,
    /// Optional assistive router
    pub assist: FileAssistConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.engine.max_steps == 0 {
            issues.push(ConfigValidationError::ZeroMaxSteps);
        }
        if self.engine.default_trip_days == 0 {
            issues.push(ConfigValidationError::ZeroTripDays);
        }
        if self.retry.max_attempts == 0 {
            issues.push(ConfigValidationError::ZeroAttempts);
        }
        if self.retry.attempt_timeout_secs == 0 {
            issues.push(ConfigValidationError::ZeroTimeout);
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            issues.push(ConfigValidationError::InvalidMultiplier);
        }
        if self.research.max_items == 0 {
            issues.push(ConfigValidationError::ZeroCap("research.max_items"));
        }
        if self.activity_selection.per_category_cap == 0 {
            issues.push(ConfigValidationError::ZeroCap(
                "activity_selection.per_category_cap",
            ));
        }
        if self.activity_selection.total_cap == 0 {
            issues.push(ConfigValidationError::ZeroCap("activity_selection.total_cap"));
        }
        if self
            .assist
            .endpoint
            .as_deref()
            .is_some_and(|e| e.trim().is_empty())
        {
            issues.push(ConfigValidationError::EmptyEndpoint);
        }

        issues
    }

    /// Application-level engine parameters
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_max_steps(self.engine.max_steps)
            .with_default_trip_days(self.engine.default_trip_days)
            .with_retry(self.retry.to_policy())
            .with_research(self.research.to_params())
            .with_selection(self.activity_selection.to_caps())
    }
}
