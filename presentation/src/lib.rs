//! Presentation layer for tripsync
//!
//! This crate contains CLI definitions, the scenario file format and
//! driver, live console output and final plan formatters.

pub mod cli;
pub mod config;
pub mod output;
pub mod progress;
pub mod scenario;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use config::OutputConfig;
pub use output::console::{ConsoleFormatter, ConsoleNotifier};
pub use output::formatter::{JsonFormatter, OutputFormatter, PhaseLine, TripPlan, formatter_for};
pub use progress::reporter::ProgressReporter;
pub use scenario::{
    DriveError, DriveReport, Scenario, ScenarioAction, ScenarioDriver, ScenarioError,
};
