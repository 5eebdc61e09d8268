//! Output format value object

use serde::{Deserialize, Serialize};

/// How the final trip plan is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary (default)
    #[default]
    Text,
    /// JSON document
    Json,
}
