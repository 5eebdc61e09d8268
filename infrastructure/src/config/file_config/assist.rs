//! Assistive routing configuration from TOML (`[assist]` section)

use serde::{Deserialize, Serialize};

/// Raw assistive routing configuration from TOML.
///
/// Without an endpoint the supervisor ends a run whenever no
/// deterministic rule applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAssistConfig {
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FileAssistConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 10,
        }
    }
}
