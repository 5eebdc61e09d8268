//! Scripted trips: seed data plus member actions

mod driver;
mod file;

pub use driver::{DriveError, DriveReport, ScenarioDriver};
pub use file::{Scenario, ScenarioAction, ScenarioError, ScenarioMember, ScenarioTrip};
