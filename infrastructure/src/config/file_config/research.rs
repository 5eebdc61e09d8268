//! Research and selection configuration from TOML
//! (`[research]` and `[activity_selection]` sections)

use serde::{Deserialize, Serialize};
use tripsync_application::ResearchParams;
use tripsync_domain::SelectionCaps;

/// Raw research configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResearchConfig {
    pub max_items: usize,
    pub preferred_categories: Vec<String>,
}

impl Default for FileResearchConfig {
    fn default() -> Self {
        Self {
            max_items: 15,
            preferred_categories: Vec::new(),
        }
    }
}

impl FileResearchConfig {
    pub fn to_params(&self) -> ResearchParams {
        ResearchParams {
            max_items: self.max_items,
            preferred_categories: self.preferred_categories.clone(),
        }
    }
}

/// Raw activity selection limits from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSelectionConfig {
    pub per_category_cap: usize,
    pub total_cap: usize,
}

impl Default for FileSelectionConfig {
    fn default() -> Self {
        Self {
            per_category_cap: 7,
            total_cap: 35,
        }
    }
}

impl FileSelectionConfig {
    pub fn to_caps(&self) -> SelectionCaps {
        SelectionCaps {
            per_category: self.per_category_cap,
            total: self.total_cap,
        }
    }
}
