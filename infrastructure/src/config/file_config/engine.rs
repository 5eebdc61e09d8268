//! Engine configuration from TOML (`[engine]` section)

use serde::{Deserialize, Serialize};

/// Raw engine configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    /// Supervisor decisions allowed per run segment
    pub max_steps: u32,
    /// Trip length when nobody submitted availability
    pub default_trip_days: u32,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            default_trip_days: 7,
        }
    }
}
