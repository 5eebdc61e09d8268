//! Configuration file loading for tripsync
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TRIPSYNC_` environment variables (`__` separates section and key)
//! 2. `--config <path>` specified file
//! 3. Project root: `./tripsync.toml` or `./.tripsync.toml`
//! 4. Global: `~/.config/tripsync/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAssistConfig, FileConfig, FileEngineConfig, FileLoggingConfig,
    FileOutputConfig, FileOutputFormat, FileResearchConfig, FileRetryConfig, FileSelectionConfig,
};
pub use loader::ConfigLoader;
