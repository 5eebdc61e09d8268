//! Trip domain
//!
//! A trip is one group planning session. Members submit [`Preference`]s,
//! and the engine moves the trip through its consensus phases.

pub mod dates;
pub mod entities;
pub mod preference;

pub use dates::{DateRange, common_windows, has_any_availability};
pub use entities::{Trip, TripId, TripStatus};
pub use preference::{
    DestinationCount, Preference, PreferencesSummary, VibeWeight, destination_for_vibe,
};
