//! Output and logging configuration from TOML (`[output]` and `[logging]`)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tripsync_domain::OutputFormat;

// Re-export OutputFormat from domain for convenience
pub use tripsync_domain::OutputFormat as FileOutputFormat;

/// Raw output configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Final plan format (uses domain type)
    pub format: Option<OutputFormat>,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Append every trip event to this JSONL file
    pub event_log: Option<PathBuf>,
}
