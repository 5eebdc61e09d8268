//! Presentation-level configuration
//!
//! Resolved output settings: file config first, CLI flags on top.

use tripsync_domain::OutputFormat;

/// Output configuration for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Enable colored terminal output
    pub color: bool,
    /// Suppress live event output
    pub quiet: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
            quiet: false,
        }
    }
}

impl OutputConfig {
    /// Apply CLI overrides on top of file settings
    pub fn with_cli_overrides(mut self, format: Option<OutputFormat>, quiet: bool) -> Self {
        if let Some(format) = format {
            self.format = format;
        }
        self.quiet |= quiet;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_format_wins() {
        let config = OutputConfig::default().with_cli_overrides(Some(OutputFormat::Json), false);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.color);
    }

    #[test]
    fn test_quiet_is_sticky() {
        let config = OutputConfig {
            quiet: true,
            ..OutputConfig::default()
        }
        .with_cli_overrides(None, false);
        assert!(config.quiet);
        assert_eq!(config.format, OutputFormat::Text);
    }
}
