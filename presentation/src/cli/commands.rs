//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the final trip plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON document
    Json,
}

impl From<OutputFormat> for tripsync_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => tripsync_domain::OutputFormat::Text,
            OutputFormat::Json => tripsync_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for tripsync
#[derive(Parser, Debug)]
#[command(name = "tripsync")]
#[command(author, version, about = "Group trip planning - agents propose, members decide")]
#[command(long_about = r#"
tripsync drives a group trip through four decisions:

1. Destination: the most requested place wins, ties go to a vote
2. Dates: the longest common availability window, or a vote between windows
3. Activities: members up/down vote researched activities, then mark ready
4. Itinerary: members approve the generated day-by-day plan

A scenario file seeds the trip and scripts member actions. Actions are
applied whenever the run pauses to wait for members.

Configuration files are loaded from (in priority order):
1. TRIPSYNC_* environment variables (e.g. TRIPSYNC_ENGINE__MAX_STEPS=30)
2. --config <path>     Explicit config file
3. ./tripsync.toml     Project-level config
4. ~/.config/tripsync/config.toml   Global config

Example:
  tripsync demos/weekend.json
  tripsync demos/weekend.json --output json -vv
"#)]
pub struct Cli {
    /// Scenario file describing the trip and member actions
    #[arg(value_name = "SCENARIO")]
    pub scenario: Option<PathBuf>,

    /// Output format for the final plan (overrides config)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress live event output
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write diagnostic logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Append trip events as JSONL to this file (overrides config)
    #[arg(long, value_name = "PATH")]
    pub event_log: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scenario_and_flags() {
        let cli = Cli::try_parse_from(["tripsync", "trip.json", "-vv", "--output", "json"]).unwrap();
        assert_eq!(cli.scenario, Some(PathBuf::from("trip.json")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(!cli.no_config);
    }

    #[test]
    fn test_show_config_needs_no_scenario() {
        let cli = Cli::try_parse_from(["tripsync", "--show-config"]).unwrap();
        assert!(cli.show_config);
        assert!(cli.scenario.is_none());
    }
}
